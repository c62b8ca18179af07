//! In-memory doubles for the engine's collaborators.

use crate::error::{IndexerError, PollError};
use crate::productivity::ProductivityTelemetry;
use crate::read_path::{KickoutIndexer, LegacyCandidates};
use crate::state_access::{StateMutator, StateReader, StateSlot};
use std::collections::HashMap;
use types::{Address, Blacklist, Candidate, CandidateList, Epoch, Height, U256};

pub fn test_address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn test_candidate(address_byte: u8, votes: u64) -> Candidate {
    Candidate::new(
        test_address(address_byte),
        U256::from(votes),
        test_address(address_byte),
    )
}

/// Height-tagged slot store. `put` tags values with the current tip, the way
/// a real store tags writes with the block being processed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    tip: Height,
    slots: HashMap<StateSlot, (Vec<u8>, Height)>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&mut self, tip: Height) {
        self.tip = tip;
    }
}

impl StateReader for MemoryStateStore {
    fn tip_height(&self) -> Result<Height, PollError> {
        Ok(self.tip)
    }

    fn get(&self, slot: StateSlot) -> Result<(Vec<u8>, Height), PollError> {
        self.slots
            .get(&slot)
            .cloned()
            .ok_or(PollError::StateNotFound(slot))
    }
}

impl StateMutator for MemoryStateStore {
    fn put(&mut self, slot: StateSlot, value: Vec<u8>) -> Result<(), PollError> {
        self.slots.insert(slot, (value, self.tip));
        Ok(())
    }
}

/// Telemetry stub serving pre-seeded per-epoch reports.
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    reports: HashMap<Epoch, (u64, HashMap<Address, u64>)>,
}

impl StaticTelemetry {
    pub fn insert(&mut self, epoch: Epoch, num_blocks: u64, produced: &[(Address, u64)]) {
        self.reports
            .insert(epoch, (num_blocks, produced.iter().copied().collect()));
    }
}

impl ProductivityTelemetry for StaticTelemetry {
    fn productivity_by_epoch(
        &self,
        epoch: Epoch,
        _tip: Height,
    ) -> Result<(u64, HashMap<Address, u64>), PollError> {
        self.reports
            .get(&epoch)
            .cloned()
            .ok_or_else(|| PollError::Telemetry(format!("no block report for epoch {epoch}")))
    }
}

/// Legacy pre-activation candidate source returning a fixed list.
#[derive(Debug, Clone)]
pub struct FixedLegacyCandidates(pub CandidateList);

impl LegacyCandidates for FixedLegacyCandidates {
    fn candidates_by_height(
        &self,
        _reader: &dyn StateReader,
        _height: Height,
    ) -> Result<CandidateList, PollError> {
        Ok(self.0.clone())
    }
}

/// Indexer double serving from in-memory maps keyed by epoch start height;
/// absent keys report `NotFound`, and `poisoned` turns every lookup into an
/// internal error.
#[derive(Debug, Clone, Default)]
pub struct MapIndexer {
    pub candidates: HashMap<u64, CandidateList>,
    pub kickouts: HashMap<u64, Blacklist>,
    pub poisoned: bool,
}

impl KickoutIndexer for MapIndexer {
    fn candidate_list(&self, epoch_start_height: Height) -> Result<CandidateList, IndexerError> {
        if self.poisoned {
            return Err(IndexerError::Internal("indexer unavailable".to_string()));
        }
        self.candidates
            .get(&epoch_start_height.as_u64())
            .cloned()
            .ok_or(IndexerError::NotFound)
    }

    fn kickout_list(&self, epoch_start_height: Height) -> Result<Blacklist, IndexerError> {
        if self.poisoned {
            return Err(IndexerError::Internal("indexer unavailable".to_string()));
        }
        self.kickouts
            .get(&epoch_start_height.as_u64())
            .cloned()
            .ok_or(IndexerError::NotFound)
    }
}

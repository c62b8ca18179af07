//! Read-only query surface over live state and the optional indexer.
//!
//! Reads execute concurrently with block processing against a
//! snapshot-consistent reader; the freshness check is the only ordering
//! guarantee surfaced to callers, and a failed check means a shift landed
//! mid-query and the caller should retry.

use crate::candidates;
use crate::error::{IndexerError, PollError};
use crate::state_access::{get_blacklist, get_candidates, StateReader};
use crate::PollEngine;
use ssz::{DecodeError, Encode};
use types::{Blacklist, CandidateList, Epoch, Height};

/// Wire-stable read method names.
pub const CANDIDATES_BY_EPOCH: &str = "CandidatesByEpoch";
pub const BLOCK_PRODUCERS_BY_EPOCH: &str = "BlockProducersByEpoch";
pub const ACTIVE_BLOCK_PRODUCERS_BY_EPOCH: &str = "ActiveBlockProducersByEpoch";
pub const KICKOUT_LIST_BY_EPOCH: &str = "KickoutListByEpoch";

/// Candidate lookup for epochs that start before activation.
pub trait LegacyCandidates: Send + Sync {
    fn candidates_by_height(
        &self,
        reader: &dyn StateReader,
        height: Height,
    ) -> Result<CandidateList, PollError>;
}

/// Optional off-chain index of historical per-epoch election results, keyed
/// by epoch start height.
pub trait KickoutIndexer: Send + Sync {
    fn candidate_list(&self, epoch_start_height: Height) -> Result<CandidateList, IndexerError>;
    fn kickout_list(&self, epoch_start_height: Height) -> Result<Blacklist, IndexerError>;
}

impl PollEngine {
    /// Ranked candidates for `epoch`, defaulting to the epoch at the tip.
    pub fn candidates_by_epoch<R: StateReader>(
        &self,
        reader: &R,
        epoch: Option<Epoch>,
    ) -> Result<CandidateList, PollError> {
        let epoch = self.resolve_epoch(reader, epoch)?;
        if let Some(indexer) = &self.indexer {
            match indexer.candidate_list(epoch.start_height(self.config.blocks_per_epoch)?) {
                Ok(list) => return Ok(list),
                Err(IndexerError::NotFound) => {}
                Err(IndexerError::Internal(reason)) => return Err(PollError::Indexer(reason)),
            }
        }
        self.candidates_from_state(reader, epoch)
    }

    /// Block producers for `epoch`: the top-ranked non-zero-vote candidates.
    pub fn block_producers_by_epoch<R: StateReader>(
        &self,
        reader: &R,
        epoch: Option<Epoch>,
    ) -> Result<CandidateList, PollError> {
        let ranked = self.candidates_by_epoch(reader, epoch)?;
        Ok(candidates::block_producers(
            &ranked,
            self.config.num_candidate_delegates,
        ))
    }

    /// The active rotating committee for `epoch`.
    pub fn active_block_producers_by_epoch<R: StateReader>(
        &self,
        reader: &R,
        epoch: Option<Epoch>,
    ) -> Result<CandidateList, PollError> {
        let epoch = self.resolve_epoch(reader, epoch)?;
        let producers = self.block_producers_by_epoch(reader, Some(epoch))?;
        Ok(candidates::active_block_producers(
            &producers,
            self.config.num_delegates,
            epoch.start_height(self.config.blocks_per_epoch)?,
        ))
    }

    /// The kick-out blacklist in force for `epoch`.
    pub fn kickout_list_by_epoch<R: StateReader>(
        &self,
        reader: &R,
        epoch: Option<Epoch>,
    ) -> Result<Blacklist, PollError> {
        let epoch = self.resolve_epoch(reader, epoch)?;
        let epoch_start = epoch.start_height(self.config.blocks_per_epoch)?;
        if epoch_start < self.config.easter_height {
            return Err(PollError::PreEasterQuery(epoch));
        }
        if let Some(indexer) = &self.indexer {
            match indexer.kickout_list(epoch_start) {
                Ok(blacklist) => return Ok(blacklist),
                Err(IndexerError::NotFound) => {}
                Err(IndexerError::Internal(reason)) => return Err(PollError::Indexer(reason)),
            }
        }
        let (blacklist, recorded) = get_blacklist(reader, self.reads_from_next(reader, epoch)?)?;
        self.check_freshness(epoch, epoch_start, recorded)?;
        Ok(blacklist)
    }

    /// Serve a wire read method, returning the canonical SSZ encoding.
    ///
    /// The optional first argument is a big-endian `u64` epoch number; when
    /// absent, the epoch at the tip is served.
    pub fn read_state<R: StateReader>(
        &self,
        reader: &R,
        method: &str,
        args: &[&[u8]],
    ) -> Result<Vec<u8>, PollError> {
        let epoch = args.first().map(|bytes| decode_epoch_arg(bytes)).transpose()?;
        match method {
            CANDIDATES_BY_EPOCH => Ok(self.candidates_by_epoch(reader, epoch)?.as_ssz_bytes()),
            BLOCK_PRODUCERS_BY_EPOCH => {
                Ok(self.block_producers_by_epoch(reader, epoch)?.as_ssz_bytes())
            }
            ACTIVE_BLOCK_PRODUCERS_BY_EPOCH => Ok(self
                .active_block_producers_by_epoch(reader, epoch)?
                .as_ssz_bytes()),
            KICKOUT_LIST_BY_EPOCH => Ok(self.kickout_list_by_epoch(reader, epoch)?.as_ssz_bytes()),
            _ => Err(PollError::MethodUnknown(method.to_string())),
        }
    }

    /// Ranked candidates read from live state only, bypassing the indexer.
    /// This is the path the consensus boundary uses, so an attached indexer
    /// can never influence state transitions.
    pub(crate) fn candidates_from_state<R: StateReader>(
        &self,
        reader: &R,
        epoch: Epoch,
    ) -> Result<CandidateList, PollError> {
        let epoch_start = epoch.start_height(self.config.blocks_per_epoch)?;
        if epoch_start < self.config.easter_height {
            // Wrapping this in another epoch-of-start round trip would be a
            // no-op: start_of(epoch_of(start)) is the identity.
            return self.legacy.candidates_by_height(reader, epoch_start);
        }
        let read_from_next = self.reads_from_next(reader, epoch)?;
        let (raw, recorded) = get_candidates(reader, read_from_next)?;
        self.check_freshness(epoch, epoch_start, recorded)?;
        let (blacklist, recorded) = get_blacklist(reader, read_from_next)?;
        self.check_freshness(epoch, epoch_start, recorded)?;
        candidates::filter_and_rank(&raw, &blacklist, epoch_start)
    }

    pub(crate) fn active_block_producers_from_state<R: StateReader>(
        &self,
        reader: &R,
        epoch: Epoch,
    ) -> Result<CandidateList, PollError> {
        let ranked = self.candidates_from_state(reader, epoch)?;
        let producers =
            candidates::block_producers(&ranked, self.config.num_candidate_delegates);
        Ok(candidates::active_block_producers(
            &producers,
            self.config.num_delegates,
            epoch.start_height(self.config.blocks_per_epoch)?,
        ))
    }

    fn resolve_epoch<R: StateReader>(
        &self,
        reader: &R,
        epoch: Option<Epoch>,
    ) -> Result<Epoch, PollError> {
        match epoch {
            Some(epoch) => Ok(epoch),
            None => Ok(reader.tip_height()?.epoch(self.config.blocks_per_epoch)?),
        }
    }

    /// Queries for the epoch after the tip's are served from the `next`
    /// slots, which hold state computed at the previous boundary but not yet
    /// rotated.
    fn reads_from_next<R: StateReader>(
        &self,
        reader: &R,
        epoch: Epoch,
    ) -> Result<bool, PollError> {
        let tip_epoch = reader.tip_height()?.epoch(self.config.blocks_per_epoch)?;
        Ok(epoch == tip_epoch.safe_add(1)?)
    }

    /// Fail when the slot was written by a newer epoch than the one
    /// requested, i.e. a shift landed while the caller was reading.
    fn check_freshness(
        &self,
        epoch: Epoch,
        epoch_start: Height,
        recorded: Height,
    ) -> Result<(), PollError> {
        if recorded.epoch(self.config.blocks_per_epoch)? > epoch {
            return Err(PollError::InconsistentHeight {
                expected: epoch_start,
                found: recorded,
            });
        }
        Ok(())
    }
}

fn decode_epoch_arg(bytes: &[u8]) -> Result<Epoch, PollError> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| {
            PollError::SszDecode(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 8,
            })
        })?;
    Ok(Epoch::new(u64::from_be_bytes(array)))
}

//! Typed access to the engine's persisted slots.
//!
//! The state store is the single source of truth: every helper re-reads or
//! rewrites a whole slot, and nothing here caches across invocations. Writes
//! are tagged by the store with the height of the block being processed and
//! commit atomically with it.

use crate::error::PollError;
use ssz::{Decode, DecodeError, Encode};
use types::{Blacklist, CandidateList, Height, PollConfig, UnproductiveDelegates};

/// Persisted slots owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    CandidatesCurrent,
    CandidatesNext,
    BlacklistCurrent,
    BlacklistNext,
    UnproductiveDelegates,
}

impl StateSlot {
    /// Byte key of the slot in the consensus state store.
    pub fn key(self) -> &'static [u8] {
        match self {
            StateSlot::CandidatesCurrent => b"cand_cur",
            StateSlot::CandidatesNext => b"cand_next",
            StateSlot::BlacklistCurrent => b"bl_cur",
            StateSlot::BlacklistNext => b"bl_next",
            StateSlot::UnproductiveDelegates => b"upd",
        }
    }
}

/// Snapshot-consistent view of consensus state.
pub trait StateReader {
    /// Tip height of this view.
    fn tip_height(&self) -> Result<Height, PollError>;

    /// Raw slot value and the height at which it was written.
    fn get(&self, slot: StateSlot) -> Result<(Vec<u8>, Height), PollError>;
}

/// Write half of the state store, held by the block-processing pipeline.
pub trait StateMutator: StateReader {
    fn put(&mut self, slot: StateSlot, value: Vec<u8>) -> Result<(), PollError>;
}

pub fn get_candidates<R: StateReader + ?Sized>(
    reader: &R,
    read_from_next: bool,
) -> Result<(CandidateList, Height), PollError> {
    let slot = if read_from_next {
        StateSlot::CandidatesNext
    } else {
        StateSlot::CandidatesCurrent
    };
    let (bytes, height) = reader.get(slot)?;
    Ok((CandidateList::from_ssz_bytes(&bytes)?, height))
}

pub fn set_candidates<M: StateMutator + ?Sized>(
    state: &mut M,
    candidates: &CandidateList,
    write_to_next: bool,
) -> Result<(), PollError> {
    let slot = if write_to_next {
        StateSlot::CandidatesNext
    } else {
        StateSlot::CandidatesCurrent
    };
    state.put(slot, candidates.as_ssz_bytes())
}

pub fn get_blacklist<R: StateReader + ?Sized>(
    reader: &R,
    read_from_next: bool,
) -> Result<(Blacklist, Height), PollError> {
    let slot = if read_from_next {
        StateSlot::BlacklistNext
    } else {
        StateSlot::BlacklistCurrent
    };
    let (bytes, height) = reader.get(slot)?;
    Ok((Blacklist::from_ssz_bytes(&bytes)?, height))
}

pub fn set_blacklist<M: StateMutator + ?Sized>(
    state: &mut M,
    blacklist: &Blacklist,
    write_to_next: bool,
) -> Result<(), PollError> {
    let slot = if write_to_next {
        StateSlot::BlacklistNext
    } else {
        StateSlot::BlacklistCurrent
    };
    state.put(slot, blacklist.as_ssz_bytes())
}

/// Load the unproductive-delegate ring, rebuilding it under the configured
/// window. A slot that has never been written yields a fresh empty ring; a
/// stored ring longer than `max_kickout_period` is rejected as corrupt. When
/// the configured window shrank across a restart the oldest epochs fall off.
pub fn get_unproductive_delegates<R: StateReader + ?Sized>(
    reader: &R,
    config: &PollConfig,
) -> Result<UnproductiveDelegates, PollError> {
    match reader.get(StateSlot::UnproductiveDelegates) {
        Ok((bytes, _)) => {
            let stored = UnproductiveDelegates::from_ssz_bytes(&bytes)?;
            if stored.len() as u64 > config.max_kickout_period {
                return Err(PollError::SszDecode(DecodeError::BytesInvalid(format!(
                    "stored ring of {} epochs exceeds max_kickout_period {}",
                    stored.len(),
                    config.max_kickout_period
                ))));
            }
            let mut ring = UnproductiveDelegates::new(config.kickout_epoch_period);
            for set in stored.iter() {
                ring.push(set.to_vec());
            }
            Ok(ring)
        }
        Err(PollError::StateNotFound(_)) => {
            Ok(UnproductiveDelegates::new(config.kickout_epoch_period))
        }
        Err(e) => Err(e),
    }
}

pub fn set_unproductive_delegates<M: StateMutator + ?Sized>(
    state: &mut M,
    ring: &UnproductiveDelegates,
) -> Result<(), PollError> {
    state.put(StateSlot::UnproductiveDelegates, ring.as_ssz_bytes())
}

/// Rename `candidates_next` to `candidates_current`, returning the height at
/// which the consumed `next` value was written.
pub fn shift_candidates<M: StateMutator + ?Sized>(state: &mut M) -> Result<Height, PollError> {
    let (bytes, height) = state.get(StateSlot::CandidatesNext)?;
    state.put(StateSlot::CandidatesCurrent, bytes)?;
    Ok(height)
}

/// Blacklist counterpart of [`shift_candidates`]; the two must observe the
/// same recorded height within one boundary.
pub fn shift_blacklist<M: StateMutator + ?Sized>(state: &mut M) -> Result<Height, PollError> {
    let (bytes, height) = state.get(StateSlot::BlacklistNext)?;
    state.put(StateSlot::BlacklistCurrent, bytes)?;
    Ok(height)
}

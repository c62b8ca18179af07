use crate::Address;
use serde::{Deserialize, Serialize};
use ssz::{Decode as _, DecodeError, Encode as _};
use ssz_derive::{Decode, Encode};
use std::collections::VecDeque;

/// Bounded ring of recent per-epoch unproductive-delegate sets, oldest first.
///
/// The ring holds at most `window` sets; pushing a new set at capacity evicts
/// the oldest. Together with the blacklist it encodes the same information in
/// two shapes: the ring keeps per-epoch sets for time-windowed eviction, the
/// blacklist precomputes per-address strike counts for membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnproductiveDelegates {
    window: u64,
    sets: VecDeque<Vec<Address>>,
}

#[derive(Encode, Decode)]
struct UnproductiveDelegatesSsz {
    window: u64,
    sets: Vec<Vec<Address>>,
}

impl UnproductiveDelegates {
    pub fn new(window: u64) -> Self {
        Self {
            window,
            sets: VecDeque::new(),
        }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Append the newest per-epoch set, evicting the oldest at capacity.
    pub fn push(&mut self, set: Vec<Address>) {
        if self.window == 0 {
            return;
        }
        while self.sets.len() as u64 >= self.window {
            self.sets.pop_front();
        }
        self.sets.push_back(set);
    }

    pub fn oldest(&self) -> Option<&[Address]> {
        self.sets.front().map(|set| set.as_slice())
    }

    /// Retained sets, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[Address]> {
        self.sets.iter().map(|set| set.as_slice())
    }

    /// All addresses across retained epochs, duplicates preserved.
    pub fn flattened(&self) -> Vec<Address> {
        self.iter().flat_map(|set| set.iter().copied()).collect()
    }
}

impl ssz::Encode for UnproductiveDelegates {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        self.to_ssz_container().ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        self.to_ssz_container().ssz_append(buf)
    }
}

impl UnproductiveDelegates {
    fn to_ssz_container(&self) -> UnproductiveDelegatesSsz {
        UnproductiveDelegatesSsz {
            window: self.window,
            sets: self.sets.iter().cloned().collect(),
        }
    }
}

impl ssz::Decode for UnproductiveDelegates {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let container = UnproductiveDelegatesSsz::from_ssz_bytes(bytes)?;
        if container.sets.len() as u64 > container.window {
            return Err(DecodeError::BytesInvalid(format!(
                "unproductive-delegate ring holds {} sets, window is {}",
                container.sets.len(),
                container.window
            )));
        }
        Ok(Self {
            window: container.window,
            sets: container.sets.into(),
        })
    }
}

use crate::Address;
use serde::{Deserialize, Serialize};
use ssz::{Decode as _, DecodeError, Encode as _};
use ssz_derive::{Decode, Encode};
use std::collections::BTreeMap;

/// A single blacklist entry in canonical (address-ascending) encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BlacklistEntry {
    pub address: Address,
    pub strike_count: u32,
}

/// Delegates under voting-power attenuation, with per-address strike counts.
///
/// A strike is one unproductive epoch inside the kick-out window; the count
/// therefore never exceeds the window length. Entries whose strikes have all
/// expired are pruned before the blacklist is persisted, so a stored
/// blacklist never carries a zero strike count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blacklist {
    /// Percentage in [0, 100] by which a listed delegate's voting power is
    /// reduced. The multiplier applied at election time is
    /// `(100 - intensity_rate) / 100`, once per address regardless of the
    /// strike count.
    pub intensity_rate: u32,
    pub entries: BTreeMap<Address, u32>,
}

#[derive(Encode, Decode)]
struct BlacklistSsz {
    intensity_rate: u32,
    entries: Vec<BlacklistEntry>,
}

impl Blacklist {
    pub fn new(intensity_rate: u32) -> Self {
        Self {
            intensity_rate,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn strikes(&self, address: &Address) -> Option<u32> {
        self.entries.get(address).copied()
    }

    pub fn total_strikes(&self) -> u64 {
        self.entries.values().map(|count| u64::from(*count)).sum()
    }

    /// Record one more unproductive epoch for `address`.
    pub fn add_strike(&mut self, address: Address) {
        self.entries
            .entry(address)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    /// Expire one strike for `address`. Returns `false` when the address has
    /// no entry at all, which callers must treat as state corruption.
    ///
    /// A count may reach zero here; it stays in the map until
    /// [`Self::prune_expired`] runs at the end of the maintenance pass.
    pub fn forgive_strike(&mut self, address: &Address) -> bool {
        match self.entries.get_mut(address) {
            Some(count) => {
                *count = count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Drop entries whose strikes have all expired.
    pub fn prune_expired(&mut self) {
        self.entries.retain(|_, count| *count > 0);
    }

    fn to_ssz_container(&self) -> BlacklistSsz {
        BlacklistSsz {
            intensity_rate: self.intensity_rate,
            entries: self
                .entries
                .iter()
                .map(|(address, strike_count)| BlacklistEntry {
                    address: *address,
                    strike_count: *strike_count,
                })
                .collect(),
        }
    }
}

impl ssz::Encode for Blacklist {
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

impl ssz::Decode for Blacklist {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let container = BlacklistSsz::from_ssz_bytes(bytes)?;
        let mut entries = BTreeMap::new();
        let mut previous: Option<Address> = None;
        for entry in container.entries {
            if entry.strike_count == 0 {
                return Err(DecodeError::BytesInvalid(format!(
                    "blacklist entry {} has zero strikes",
                    entry.address
                )));
            }
            if previous.map_or(false, |prev| prev >= entry.address) {
                return Err(DecodeError::BytesInvalid(
                    "blacklist entries out of order".into(),
                ));
            }
            previous = Some(entry.address);
            entries.insert(entry.address, entry.strike_count);
        }
        Ok(Self {
            intensity_rate: container.intensity_rate,
            entries,
        })
    }
}

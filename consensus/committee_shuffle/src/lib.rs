//! Deterministic, seed-keyed orderings for delegate election.
//!
//! Every ordering the election pipeline emits goes through one of the two
//! entry points here; nothing downstream may depend on hash-map iteration
//! order. Both orderings are keyed by the epoch start height so that equal
//! inputs rotate deterministically from one epoch to the next.

use alloy_primitives::{Address, U256};
use ethereum_hashing::hash_fixed;
use std::collections::BTreeMap;

/// Fixed ordering seed distributed with the protocol release.
pub const PROTOCOL_SORT_SEED: [u8; 32] = [
    0x7c, 0x3a, 0x91, 0x0e, 0x5d, 0x22, 0xb8, 0x46, 0xf1, 0x68, 0x0b, 0xd4, 0x2f, 0x9c, 0x57, 0xe3,
    0x84, 0x1d, 0xc6, 0x39, 0xaa, 0x50, 0x07, 0xbe, 0x62, 0xf8, 0x15, 0x4b, 0xd0, 0x2e, 0x99, 0x6c,
];

fn ordering_digest(seed: &[u8], epoch_start_height: u64, address: &Address) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(seed.len() + 8 + Address::len_bytes());
    preimage.extend_from_slice(seed);
    preimage.extend_from_slice(&epoch_start_height.to_be_bytes());
    preimage.extend_from_slice(address.as_slice());
    hash_fixed(&preimage)
}

/// Reorder `addresses` in place by their seeded digest.
///
/// This is the committee shuffle: with a fresh `epoch_start_height` every
/// epoch, the same address set comes out in a different but fully
/// deterministic order. Address bytes break the (practically unreachable)
/// digest tie so the ordering is total.
pub fn sort_by_seeded_hash(addresses: &mut [Address], epoch_start_height: u64, seed: &[u8]) {
    addresses.sort_by_cached_key(|address| (ordering_digest(seed, epoch_start_height, address), *address));
}

/// Order addresses by votes, descending; equal votes fall back to the seeded
/// digest order so ties rotate across epochs.
pub fn rank_by_votes(
    votes: &BTreeMap<Address, U256>,
    epoch_start_height: u64,
    seed: &[u8],
) -> Vec<Address> {
    let digests: BTreeMap<Address, [u8; 32]> = votes
        .keys()
        .map(|address| (*address, ordering_digest(seed, epoch_start_height, address)))
        .collect();

    let mut ranked: Vec<Address> = votes.keys().copied().collect();
    ranked.sort_by(|a, b| {
        votes[b]
            .cmp(&votes[a])
            .then_with(|| digests[a].cmp(&digests[b]))
            .then_with(|| a.cmp(b))
    });
    ranked
}

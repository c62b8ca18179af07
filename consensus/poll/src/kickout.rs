use crate::error::PollError;
use crate::state_access::{get_blacklist, get_unproductive_delegates, StateReader};
use itertools::Itertools;
use log::error;
use types::{Address, Blacklist, Epoch, PollConfig, UnproductiveDelegates};

/// Derive the blacklist for `target_epoch` along with the updated ring.
///
/// `unproductive` is the evaluated set of the epoch that just finished
/// (`target_epoch - 1`). Until the ring has seen a full window after
/// activation (`target_epoch ≤ activation_epoch + kickout_epoch_period`)
/// strikes are re-aggregated from the whole ring; afterwards the prior
/// blacklist slides by one epoch, expiring the oldest set and admitting the
/// newest.
pub fn next_blacklist<R: StateReader + ?Sized>(
    reader: &R,
    config: &PollConfig,
    target_epoch: Epoch,
    unproductive: Vec<Address>,
) -> Result<(Blacklist, UnproductiveDelegates), PollError> {
    let activation_epoch = config.easter_height.epoch(config.blocks_per_epoch)?;
    let bootstrap_end = activation_epoch.safe_add(config.kickout_epoch_period)?;

    let mut ring = get_unproductive_delegates(reader, config)?;
    let mut blacklist = Blacklist::new(config.kickout_intensity);

    if target_epoch <= bootstrap_end {
        for (address, strikes) in ring.flattened().into_iter().counts() {
            blacklist.entries.insert(address, strikes as u32);
        }
        for address in &unproductive {
            blacklist.add_strike(*address);
        }
        ring.push(unproductive);
    } else {
        match get_blacklist(reader, false) {
            Ok((prior, _)) => blacklist.entries = prior.entries,
            Err(PollError::StateNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let expiring = match ring.oldest() {
            Some(oldest) => oldest.to_vec(),
            None => fatal_corruption("unproductive-delegate ring empty in steady state"),
        };
        for address in &expiring {
            if !blacklist.forgive_strike(address) {
                fatal_corruption(&format!(
                    "expiring delegate {address} missing from blacklist"
                ));
            }
        }

        for address in &unproductive {
            blacklist.add_strike(*address);
        }
        ring.push(unproductive);
        blacklist.prune_expired();
    }

    debug_assert_eq!(blacklist.total_strikes() as usize, ring.flattened().len());
    Ok((blacklist, ring))
}

/// Windowed strike state is corrupt; continuing would fork consensus.
fn fatal_corruption(reason: &str) -> ! {
    error!("consensus state corrupt: {reason}");
    panic!("consensus state corrupt: {reason}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_access::{set_blacklist, set_unproductive_delegates};
    use crate::testing::{test_address, MemoryStateStore};
    use std::collections::BTreeMap;
    use types::Height;

    // Activation falls mid-way through epoch 10 on a 4-block epoch, with a
    // two-epoch strike window: epochs 11 and 12 re-aggregate, 13 onwards
    // slide.
    fn config() -> PollConfig {
        PollConfig {
            kickout_epoch_period: 2,
            max_kickout_period: 4,
            easter_height: Height::new(38),
            blocks_per_epoch: 4,
            num_candidate_delegates: 4,
            num_delegates: 4,
            ..PollConfig::default()
        }
    }

    fn persist(
        store: &mut MemoryStateStore,
        blacklist: &Blacklist,
        ring: &UnproductiveDelegates,
    ) {
        set_blacklist(store, blacklist, false).unwrap();
        set_unproductive_delegates(store, ring).unwrap();
    }

    fn entries(pairs: &[(u8, u32)]) -> BTreeMap<types::Address, u32> {
        pairs
            .iter()
            .map(|(byte, strikes)| (test_address(*byte), *strikes))
            .collect()
    }

    #[test]
    fn window_slides_across_four_epochs() {
        let config = config();
        let mut store = MemoryStateStore::new();
        let a = test_address(0xaa);
        let b = test_address(0xbb);
        let c = test_address(0xcc);

        // First boundary after activation: empty ring, epoch 10 produced one
        // offender.
        let (blacklist, ring) =
            next_blacklist(&store, &config, Epoch::new(11), vec![a]).unwrap();
        assert_eq!(blacklist.entries, entries(&[(0xaa, 1)]));
        assert_eq!(ring.flattened(), vec![a]);
        persist(&mut store, &blacklist, &ring);

        // Second bootstrap epoch: strikes re-aggregate across the ring.
        let (blacklist, ring) =
            next_blacklist(&store, &config, Epoch::new(12), vec![a, b]).unwrap();
        assert_eq!(blacklist.entries, entries(&[(0xaa, 2), (0xbb, 1)]));
        assert_eq!(ring.flattened(), vec![a, a, b]);
        persist(&mut store, &blacklist, &ring);

        // Steady state: the ring is full, so epoch 10's set expires as epoch
        // 12's enters.
        let (blacklist, ring) =
            next_blacklist(&store, &config, Epoch::new(13), vec![c]).unwrap();
        assert_eq!(
            blacklist.entries,
            entries(&[(0xaa, 1), (0xbb, 1), (0xcc, 1)])
        );
        assert_eq!(ring.flattened(), vec![a, b, c]);
        persist(&mut store, &blacklist, &ring);

        // A clean epoch expires {a, b}; their zeroed entries are pruned.
        let (blacklist, ring) =
            next_blacklist(&store, &config, Epoch::new(14), Vec::new()).unwrap();
        assert_eq!(blacklist.entries, entries(&[(0xcc, 1)]));
        assert_eq!(ring.flattened(), vec![c]);
    }

    #[test]
    fn strike_counts_match_ring_multiset() {
        let config = config();
        let mut store = MemoryStateStore::new();
        let sets: [Vec<types::Address>; 4] = [
            vec![test_address(1), test_address(2)],
            vec![test_address(1)],
            vec![test_address(2), test_address(3)],
            Vec::new(),
        ];

        for (offset, set) in sets.into_iter().enumerate() {
            let target = Epoch::new(11 + offset as u64);
            let (blacklist, ring) = next_blacklist(&store, &config, target, set).unwrap();

            let mut from_ring: BTreeMap<types::Address, u32> = BTreeMap::new();
            for address in ring.flattened() {
                *from_ring.entry(address).or_insert(0) += 1;
            }
            assert_eq!(blacklist.entries, from_ring);
            assert!(blacklist.entries.values().all(|count| *count > 0));

            persist(&mut store, &blacklist, &ring);
        }
    }

    #[test]
    fn total_strikes_bounded_by_window_times_committee() {
        let config = config();
        let mut store = MemoryStateStore::new();
        let committee: Vec<types::Address> = (1..=4).map(test_address).collect();

        for offset in 0..6u64 {
            let target = Epoch::new(11 + offset);
            let (blacklist, ring) =
                next_blacklist(&store, &config, target, committee.clone()).unwrap();
            assert!(
                blacklist.total_strikes()
                    <= config.kickout_epoch_period * committee.len() as u64
            );
            persist(&mut store, &blacklist, &ring);
        }
    }

    #[test]
    fn fresh_intensity_rate_is_stamped_on_every_blacklist() {
        let mut config = config();
        config.kickout_intensity = 75;
        let store = MemoryStateStore::new();

        let (blacklist, _) =
            next_blacklist(&store, &config, Epoch::new(11), vec![test_address(1)]).unwrap();
        assert_eq!(blacklist.intensity_rate, 75);
    }

    #[test]
    #[should_panic(expected = "consensus state corrupt")]
    fn missing_expiring_entry_is_fatal() {
        let config = config();
        let mut store = MemoryStateStore::new();

        // Hand-build contradictory state: the ring expires an address the
        // blacklist has never heard of.
        let mut ring = UnproductiveDelegates::new(config.kickout_epoch_period);
        ring.push(vec![test_address(7)]);
        ring.push(vec![test_address(8)]);
        set_unproductive_delegates(&mut store, &ring).unwrap();
        set_blacklist(&mut store, &Blacklist::new(90), false).unwrap();

        let _ = next_blacklist(&store, &config, Epoch::new(13), Vec::new());
    }
}

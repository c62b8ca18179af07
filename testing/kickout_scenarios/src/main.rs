use poll::state_access::{get_blacklist, get_unproductive_delegates, set_candidates};
use poll::testing::{test_address, test_candidate, FixedLegacyCandidates, MemoryStateStore, StaticTelemetry};
use poll::{BlockCtx, PollEngine};
use types::{Address, CandidateList, Epoch, Height, PollConfig};

const BLOCKS_PER_EPOCH: u64 = 4;

// Scenario harness for the kick-out window: four-block epochs, activation
// mid-epoch 10, a two-epoch strike window and 90 percent intensity.
fn main() {
    env_logger::init();

    println!("Driving the slashing engine across activation and four epoch boundaries");

    let config = PollConfig {
        num_candidate_delegates: 4,
        num_delegates: 4,
        prod_threshold: 85,
        kickout_epoch_period: 2,
        max_kickout_period: 4,
        kickout_intensity: 90,
        easter_height: Height::new(38),
        blocks_per_epoch: BLOCKS_PER_EPOCH,
    };

    let a = test_address(0xa1);
    let b = test_address(0xb2);
    let c = test_address(0xc3);
    let d = test_address(0xd4);

    let candidates: CandidateList = vec![
        test_candidate(0xa1, 400),
        test_candidate(0xb2, 300),
        test_candidate(0xc3, 200),
        test_candidate(0xd4, 100),
    ]
    .into();

    // Sealed-block reports per epoch; with the in-flight block the expected
    // count is 20 / 4 = 5 blocks per delegate.
    let mut telemetry = StaticTelemetry::default();
    telemetry.insert(Epoch::new(10), 19, &[(b, 7), (c, 6), (d, 6)]);
    telemetry.insert(Epoch::new(11), 19, &[(c, 10), (d, 9)]);
    telemetry.insert(Epoch::new(12), 19, &[(a, 7), (b, 7), (d, 5)]);
    telemetry.insert(Epoch::new(13), 19, &[(a, 5), (b, 5), (c, 5), (d, 4)]);

    let engine = PollEngine::new(
        config,
        Box::new(telemetry),
        Box::new(FixedLegacyCandidates(candidates.clone())),
    )
    .expect("config is valid");

    let mut store = MemoryStateStore::new();
    let producers = [b, d, d, d];
    let expected_blacklists: [&[(Address, u32)]; 4] = [
        &[(a, 1)],
        &[(a, 2), (b, 1)],
        &[(a, 1), (b, 1), (c, 1)],
        &[(c, 1)],
    ];

    for (round, (epoch, expected)) in (10u64..).zip(expected_blacklists).enumerate() {
        let last = Epoch::new(epoch).last_height(BLOCKS_PER_EPOCH).unwrap();
        store.set_tip(last);
        engine
            .handle_block(
                &BlockCtx {
                    height: last,
                    producer: producers[round],
                },
                &mut store,
            )
            .expect("boundary computation");
        set_candidates(&mut store, &candidates, true).expect("next candidates");

        let start = Epoch::new(epoch + 1).start_height(BLOCKS_PER_EPOCH).unwrap();
        store.set_tip(start);
        engine
            .handle_block(
                &BlockCtx {
                    height: start,
                    producer: producers[round],
                },
                &mut store,
            )
            .expect("rotation");

        let (blacklist, _) = get_blacklist(&store, false).expect("rotated blacklist");
        let entries: Vec<(Address, u32)> = blacklist.entries.iter().map(|(k, v)| (*k, *v)).collect();
        let ring = get_unproductive_delegates(&store, engine.config()).expect("ring");

        println!(
            "epoch {} -> {}: blacklist {:?}, ring of {} sets",
            epoch,
            epoch + 1,
            entries,
            ring.len()
        );
        assert_eq!(entries, expected, "blacklist for epoch {}", epoch + 1);
        assert_eq!(
            blacklist.total_strikes() as usize,
            ring.flattened().len(),
            "strike counts must mirror the ring"
        );
    }

    // By epoch 14 only c is still listed, so a's raw 400 votes lead again
    // while c's 200 collapse to 20 under the 90 percent intensity.
    let ranked = engine
        .candidates_by_epoch(&store, Some(Epoch::new(14)))
        .expect("ranked candidates");
    println!(
        "epoch 14 ranking: {:?}",
        ranked.iter().map(|cand| cand.votes).collect::<Vec<_>>()
    );
    assert_eq!(ranked.addresses(), vec![a, b, d, c]);

    let committee = engine
        .active_block_producers_by_epoch(&store, Some(Epoch::new(14)))
        .expect("committee");
    assert_eq!(committee.len(), 4);
    println!("epoch 14 committee: {:?}", committee.addresses());

    println!("All boundary scenarios passed");
}

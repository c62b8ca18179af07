use crate::error::PollError;
use crate::BlockCtx;
use safe_arith::SafeArith;
use std::collections::HashMap;
use types::{Address, Epoch, Height};

/// Telemetry over sealed blocks, supplied by the block pipeline.
pub trait ProductivityTelemetry: Send + Sync {
    /// Number of blocks sealed in `epoch` up to `tip`, and per-producer
    /// counts over the same range. The block currently being processed is
    /// not yet included.
    fn productivity_by_epoch(
        &self,
        epoch: Epoch,
        tip: Height,
    ) -> Result<(u64, HashMap<Address, u64>), PollError>;
}

/// Members of `active_committee` whose productivity in `epoch` fell strictly
/// below `prod_threshold` percent of the expected block count.
///
/// Runs at the last block of `epoch`, before that block reaches telemetry,
/// so the in-flight block and its producer are counted in by hand. A
/// committee member missing from telemetry sealed nothing at all and is
/// counted at zero. The result is address-sorted; callers treat it as a set.
pub fn unproductive_delegates<T: ProductivityTelemetry + ?Sized>(
    telemetry: &T,
    epoch: Epoch,
    ctx: &BlockCtx,
    active_committee: &[Address],
    prod_threshold: u64,
) -> Result<Vec<Address>, PollError> {
    let (mut num_blocks, mut produced) = telemetry.productivity_by_epoch(epoch, ctx.height)?;
    num_blocks.safe_add_assign(1)?;
    produced
        .entry(ctx.producer)
        .and_modify(|count| *count += 1)
        .or_insert(1);

    for delegate in active_committee {
        produced.entry(*delegate).or_insert(0);
    }

    if produced.is_empty() {
        return Ok(Vec::new());
    }
    let expected = num_blocks.safe_div(produced.len() as u64)?;
    if expected == 0 {
        return Ok(Vec::new());
    }

    let mut unproductive = Vec::new();
    for (address, count) in &produced {
        if count.safe_mul(100)?.safe_div(expected)? < prod_threshold {
            unproductive.push(*address);
        }
    }
    unproductive.sort_unstable();
    Ok(unproductive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, StaticTelemetry};

    fn committee() -> Vec<Address> {
        (1..=4).map(test_address).collect()
    }

    fn ctx(producer: Address) -> BlockCtx {
        BlockCtx {
            height: Height::new(40),
            producer,
        }
    }

    #[test]
    fn silent_committee_member_is_unproductive() {
        let mut telemetry = StaticTelemetry::default();
        // 19 sealed blocks; the 20th is the one being processed. Expected is
        // 20 / 4 = 5 per delegate.
        telemetry.insert(
            Epoch::new(10),
            19,
            &[
                (test_address(2), 7),
                (test_address(3), 6),
                (test_address(4), 6),
            ],
        );

        let unproductive = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(2)),
            &committee(),
            85,
        )
        .unwrap();

        assert_eq!(unproductive, vec![test_address(1)]);
    }

    #[test]
    fn in_flight_block_rescues_its_producer() {
        let mut telemetry = StaticTelemetry::default();
        // Producer 1 has 4 of an expected 5 blocks in telemetry; the block
        // being processed is also theirs, lifting them to 100 percent.
        telemetry.insert(
            Epoch::new(10),
            19,
            &[
                (test_address(1), 4),
                (test_address(2), 5),
                (test_address(3), 5),
                (test_address(4), 5),
            ],
        );

        let unproductive = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(1)),
            &committee(),
            85,
        )
        .unwrap();

        assert!(unproductive.is_empty());
    }

    #[test]
    fn threshold_is_strict() {
        let mut telemetry = StaticTelemetry::default();
        // Expected 20 / 4 = 5. Delegate 1 produced 4 of 5: exactly 80.
        telemetry.insert(
            Epoch::new(10),
            19,
            &[
                (test_address(1), 4),
                (test_address(2), 5),
                (test_address(3), 5),
                (test_address(4), 5),
            ],
        );

        let at_threshold = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(2)),
            &committee(),
            80,
        )
        .unwrap();
        assert!(at_threshold.is_empty());

        let above_threshold = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(2)),
            &committee(),
            81,
        )
        .unwrap();
        assert_eq!(above_threshold, vec![test_address(1)]);
    }

    #[test]
    fn tiny_epoch_treats_everyone_as_productive() {
        let mut telemetry = StaticTelemetry::default();
        // Two sealed blocks over a four-member committee: expected is 3 / 4 = 0.
        telemetry.insert(Epoch::new(10), 2, &[(test_address(2), 2)]);

        let unproductive = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(2)),
            &committee(),
            85,
        )
        .unwrap();

        assert!(unproductive.is_empty());
    }

    #[test]
    fn result_is_address_sorted() {
        let mut telemetry = StaticTelemetry::default();
        telemetry.insert(Epoch::new(10), 19, &[(test_address(4), 19)]);

        let unproductive = unproductive_delegates(
            &telemetry,
            Epoch::new(10),
            &ctx(test_address(4)),
            &committee(),
            85,
        )
        .unwrap();

        assert_eq!(
            unproductive,
            vec![test_address(1), test_address(2), test_address(3)]
        );
    }
}

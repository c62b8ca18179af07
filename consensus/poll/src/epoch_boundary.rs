use crate::error::PollError;
use crate::state_access::{
    set_blacklist, set_unproductive_delegates, shift_blacklist, shift_candidates, StateMutator,
};
use crate::{kickout, productivity, BlockCtx, PollEngine};
use log::debug;

impl PollEngine {
    /// Epoch-boundary driver, invoked from the block pipeline at every
    /// height while it holds the state write lock.
    ///
    /// At the last block of epoch `e`, provided the next epoch starts at or
    /// after activation, the blacklist for `e + 1` is evaluated and persisted
    /// to the `next` slots together with the updated unproductive-delegate
    /// ring. At the first post-activation block of an epoch the `next` slots
    /// rotate into `current`. Every other height is a no-op. The two actions
    /// land on distinct heights because epochs span at least two blocks.
    pub fn handle_block<M: StateMutator>(
        &self,
        ctx: &BlockCtx,
        state: &mut M,
    ) -> Result<(), PollError> {
        let blocks_per_epoch = self.config.blocks_per_epoch;
        let epoch = ctx.height.epoch(blocks_per_epoch)?;

        if ctx.height == epoch.last_height(blocks_per_epoch)? {
            let next_epoch = epoch.safe_add(1)?;
            if next_epoch.start_height(blocks_per_epoch)? >= self.config.easter_height {
                let committee = self
                    .active_block_producers_from_state(state, epoch)?
                    .addresses();
                let unproductive = productivity::unproductive_delegates(
                    self.telemetry.as_ref(),
                    epoch,
                    ctx,
                    &committee,
                    self.config.prod_threshold,
                )?;
                debug!(
                    "epoch {}: {} of {} delegates below threshold",
                    epoch,
                    unproductive.len(),
                    committee.len()
                );
                let (blacklist, ring) =
                    kickout::next_blacklist(state, &self.config, next_epoch, unproductive)?;
                set_blacklist(state, &blacklist, true)?;
                set_unproductive_delegates(state, &ring)?;
            }
        } else if ctx.height == epoch.start_height(blocks_per_epoch)?
            && ctx.height >= self.config.easter_height
        {
            let candidates_height = shift_candidates(state)?;
            let blacklist_height = shift_blacklist(state)?;
            if candidates_height != blacklist_height {
                return Err(PollError::InconsistentHeight {
                    expected: candidates_height,
                    found: blacklist_height,
                });
            }
            debug!(
                "epoch {}: rotated next state written at height {}",
                epoch, candidates_height
            );
        }
        Ok(())
    }
}

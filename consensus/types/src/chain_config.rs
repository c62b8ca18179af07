use crate::Height;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUM_CANDIDATE_DELEGATES: u64 = 36;
pub const DEFAULT_NUM_DELEGATES: u64 = 24;
/// Productivity floor, in percent of the expected block count.
pub const DEFAULT_PRODUCTIVITY_THRESHOLD: u64 = 85;
pub const DEFAULT_KICKOUT_EPOCH_PERIOD: u64 = 7;
pub const DEFAULT_MAX_KICKOUT_PERIOD: u64 = 20;
pub const DEFAULT_KICKOUT_INTENSITY: u32 = 90;

/// Parameters of the delegate election and slashing engine.
///
/// Immutable after construction; every full node must run identical values or
/// epoch transitions diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of block producers elected per epoch.
    pub num_candidate_delegates: u64,
    /// Size of the active rotating committee within the block producers.
    pub num_delegates: u64,
    /// Productivity percentage in [0, 100] below which a delegate is
    /// unproductive for the epoch.
    pub prod_threshold: u64,
    /// Number of epochs over which strikes accumulate before expiring.
    pub kickout_epoch_period: u64,
    /// Hard cap on the persisted unproductive-delegate ring, bounding the
    /// window across restarts and configuration changes.
    pub max_kickout_period: u64,
    /// Intensity rate stamped on every freshly computed blacklist.
    pub kickout_intensity: u32,
    /// Height at which the slashing feature activates. Below it the engine
    /// serves the legacy candidate view and maintains no blacklist.
    pub easter_height: Height,
    /// Blocks sealed per epoch.
    pub blocks_per_epoch: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            num_candidate_delegates: DEFAULT_NUM_CANDIDATE_DELEGATES,
            num_delegates: DEFAULT_NUM_DELEGATES,
            prod_threshold: DEFAULT_PRODUCTIVITY_THRESHOLD,
            kickout_epoch_period: DEFAULT_KICKOUT_EPOCH_PERIOD,
            max_kickout_period: DEFAULT_MAX_KICKOUT_PERIOD,
            kickout_intensity: DEFAULT_KICKOUT_INTENSITY,
            easter_height: Height::new(1),
            blocks_per_epoch: DEFAULT_NUM_DELEGATES * 15,
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks_per_epoch < 2 {
            return Err("blocks_per_epoch must be at least 2".into());
        }
        if self.prod_threshold > 100 {
            return Err(format!(
                "prod_threshold {} exceeds 100 percent",
                self.prod_threshold
            ));
        }
        if self.kickout_intensity > 100 {
            return Err(format!(
                "kickout_intensity {} exceeds 100 percent",
                self.kickout_intensity
            ));
        }
        if self.kickout_epoch_period == 0 {
            return Err("kickout_epoch_period must be non-zero".into());
        }
        if self.kickout_epoch_period > self.max_kickout_period {
            return Err(format!(
                "kickout_epoch_period {} exceeds max_kickout_period {}",
                self.kickout_epoch_period, self.max_kickout_period
            ));
        }
        if self.num_delegates == 0 || self.num_candidate_delegates < self.num_delegates {
            return Err(format!(
                "committee of {} cannot be drawn from {} block producers",
                self.num_delegates, self.num_candidate_delegates
            ));
        }
        if self.easter_height.as_u64() == 0 {
            return Err("easter_height 0 predates genesis".into());
        }
        Ok(())
    }
}

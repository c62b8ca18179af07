//! Delegate election and slashing engine for a Roll-DPoS chain.
//!
//! At the close of every epoch the engine ranks candidates, elects the block
//! producers and the active rotating committee for the next epoch, and
//! maintains a windowed blacklist that attenuates the voting power of
//! delegates whose block production fell below the productivity threshold.
//!
//! Everything on the consensus path is deterministic: every ordering is
//! explicit, all ratio arithmetic is integer, and every full node processing
//! the same block produces byte-identical state. The engine holds no cache.
//! Each invocation re-reads the slots it depends on through the provided
//! state view, and writes commit atomically with the enclosing block.

pub mod candidates;
mod epoch_boundary;
pub mod error;
mod kickout;
pub mod productivity;
pub mod read_path;
pub mod state_access;
pub mod testing;

pub use error::{IndexerError, PollError};
pub use productivity::ProductivityTelemetry;
pub use read_path::{KickoutIndexer, LegacyCandidates};

use types::{Address, Height, PollConfig};

/// Context of the block currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCtx {
    pub height: Height,
    pub producer: Address,
}

/// The delegate election and slashing engine.
///
/// One instance serves both the consensus path ([`PollEngine::handle_block`])
/// and the read path; configuration is immutable after construction.
pub struct PollEngine {
    config: PollConfig,
    telemetry: Box<dyn ProductivityTelemetry>,
    legacy: Box<dyn LegacyCandidates>,
    indexer: Option<Box<dyn KickoutIndexer>>,
}

impl PollEngine {
    pub fn new(
        config: PollConfig,
        telemetry: Box<dyn ProductivityTelemetry>,
        legacy: Box<dyn LegacyCandidates>,
    ) -> Result<Self, PollError> {
        config.validate().map_err(PollError::InvalidConfig)?;
        Ok(Self {
            config,
            telemetry,
            legacy,
            indexer: None,
        })
    }

    /// Attach an off-chain indexer for historical read queries.
    pub fn with_indexer(mut self, indexer: Box<dyn KickoutIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }
}

use crate::state_access::StateSlot;
use safe_arith::ArithError;
use ssz::DecodeError;
use types::{Epoch, Height};

/// Errors surfaced by the election and slashing engine.
///
/// Consensus-invariant violations are deliberately absent: continuing past
/// one would fork consensus, so they abort the process instead of unwinding
/// into a caller that might retry.
#[derive(Debug, PartialEq)]
pub enum PollError {
    /// A state slot moved under a reader mid-query, or the candidate and
    /// blacklist shifts disagreed on their recorded heights. Retryable.
    InconsistentHeight { expected: Height, found: Height },
    /// The slot has never been written.
    StateNotFound(StateSlot),
    /// Blacklist state queried for an epoch that starts before activation.
    PreEasterQuery(Epoch),
    Telemetry(String),
    /// Unrecognized read-path method name.
    MethodUnknown(String),
    Indexer(String),
    InvalidConfig(String),
    Arith(ArithError),
    SszDecode(DecodeError),
}

impl From<ArithError> for PollError {
    fn from(e: ArithError) -> Self {
        Self::Arith(e)
    }
}

impl From<DecodeError> for PollError {
    fn from(e: DecodeError) -> Self {
        Self::SszDecode(e)
    }
}

/// Errors from the optional off-chain indexer. `NotFound` falls through to
/// live state; anything else terminates the read.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexerError {
    NotFound,
    Internal(String),
}

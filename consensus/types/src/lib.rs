//! Consensus types for the Roll-DPoS delegate election and slashing pipeline.
//!
//! Everything in this crate is persisted to, or derived from, consensus state
//! and therefore serializes byte-stably: lists keep their order, maps encode
//! as address-sorted entry vectors.

pub mod blacklist;
pub mod candidate;
pub mod chain_config;
pub mod height_epoch;
pub mod unproductive;

pub use blacklist::{Blacklist, BlacklistEntry};
pub use candidate::{Candidate, CandidateList};
pub use chain_config::PollConfig;
pub use height_epoch::{Epoch, Height};
pub use unproductive::UnproductiveDelegates;

pub use alloy_primitives::U256;

/// Opaque fixed-size identifier of a delegate.
pub type Address = alloy_primitives::Address;

//! Off-chain reconstruction of a liquid staking contract's accounting.
//!
//! Raw storage and view results are fetched once, decoded into typed
//! records, cross-checked against the scalars the contract reports, and
//! used to decide how LP-locked value should be rebalanced.

pub mod codec;
pub mod config;
pub mod invariants;
pub mod model;
#[cfg(feature = "full")]
pub mod pipeline;
pub mod profit;
pub mod reconcile;
pub mod report;
pub mod storage;

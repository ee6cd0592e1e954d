#![warn(clippy::unwrap_used)]

pub mod catalog;

pub use catalog::{ClaimOutcome, RewardCatalog, RewardProgress};

#![warn(clippy::unwrap_used)]

pub mod ledger;
pub mod store;

pub use ledger::EngagementLedger;
pub use store::{EngagementStore, MemoryStore};

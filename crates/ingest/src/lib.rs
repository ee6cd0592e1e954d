#![warn(clippy::unwrap_used)]

pub mod events;
pub mod ingestor;
pub mod queue;

pub use ingestor::{IngestOutcome, Ingestor};
pub use queue::{InboundEvent, ScoringQueue};

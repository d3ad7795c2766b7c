//! Orchestration of the acquisition fallback chain.

pub mod outcome;
pub mod runner;

pub use outcome::{CaptionOutcome, ItemError};
pub use runner::{BatchSummary, IngestPipeline};

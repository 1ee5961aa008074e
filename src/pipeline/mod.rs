//! The reply pipeline: drafting, evaluation, and batch orchestration.
//!
//! Collected posts flow through:
//! 1. relevance scoring at ingest (`PipelineRunner::ingest`)
//! 2. persona-voiced drafting (`ReplyDrafter`)
//! 3. quality scoring (`ReplyEvaluator`)
//!
//! **No auto-posting path exists.** Every drafted reply waits in the
//! approval queue for a human decision.

pub mod drafter;
pub mod evaluator;
pub mod runner;

pub use drafter::ReplyDrafter;
pub use evaluator::ReplyEvaluator;
pub use runner::{BatchOutcome, PipelineRunner};

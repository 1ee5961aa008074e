//! xreply: persona-voiced reply drafting for X, with human review.

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod llm;
pub mod personas;
pub mod pipeline;
pub mod queue;
pub mod reports;
pub mod store;

pub use config::Settings;
pub use error::{Error, Result};

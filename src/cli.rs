//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap. Argument validation that
//! depends on runtime state (queue actions, persona keys) lives with
//! the components, not here.

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// X reply pipeline CLI
#[derive(Parser)]
#[command(name = "xreply")]
#[command(about = "Persona-voiced X reply drafting with human review", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect posts from an X list (simulated without credentials)
    Collect {
        /// X list id to pull from; omit to use simulated posts
        #[arg(long)]
        list_id: Option<String>,

        /// How many posts to fetch
        #[arg(long, default_value_t = 10)]
        count: usize,
    },

    /// Import a single post by status URL or bare id
    Import {
        /// Full status URL or numeric tweet id
        url_or_id: String,
    },

    /// Draft replies for relevant posts that have none yet
    Generate {
        /// Persona key override, e.g. "casual_degen"
        #[arg(long)]
        persona: Option<String>,
    },

    /// Review drafted replies
    Queue {
        /// One of: show, approve, reject, edit, regenerate
        #[arg(default_value = "show")]
        action: String,

        /// Reply to act on; required for everything except show
        #[arg(long)]
        reply_id: Option<Uuid>,

        /// Replacement text for edit
        #[arg(long)]
        text: Option<String>,

        /// Persona key for regenerate
        #[arg(long)]
        persona: Option<String>,
    },

    /// Score drafted replies that lack an evaluation
    Evaluate,

    /// Write the weekly Markdown and CSV report
    Report,

    /// Run the whole pipeline end to end on simulated posts
    Demo,
}

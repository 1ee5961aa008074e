//! Record types: posts, replies, evaluations, reports.
//!
//! Records reference each other by id only; callers go through the store
//! to resolve a reference. Status enums encode the lifecycle and their
//! string forms are the database representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::personas::PersonaKey;

/// Where a post came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSource {
    /// Fetched from the live X API.
    Api,
    /// Produced by the simulated feed.
    Simulation,
    /// Imported by hand from a pasted URL or id.
    Manual,
}

impl std::fmt::Display for PostSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Simulation => write!(f, "simulation"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for PostSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Self::Api),
            "simulation" => Ok(Self::Simulation),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown post source: {}", s)),
        }
    }
}

/// Post lifecycle. `collected` posts move to `filtered_in` or
/// `filtered_out` after relevance scoring; `filtered_in` posts move to
/// `reply_generated` once a reply exists. `filtered_out` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Collected,
    FilteredIn,
    FilteredOut,
    ReplyGenerated,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collected => write!(f, "collected"),
            Self::FilteredIn => write!(f, "filtered_in"),
            Self::FilteredOut => write!(f, "filtered_out"),
            Self::ReplyGenerated => write!(f, "reply_generated"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collected" => Ok(Self::Collected),
            "filtered_in" => Ok(Self::FilteredIn),
            "filtered_out" => Ok(Self::FilteredOut),
            "reply_generated" => Ok(Self::ReplyGenerated),
            _ => Err(format!("Unknown post status: {}", s)),
        }
    }
}

/// Reply lifecycle. A `generated` reply awaits review; `approved` and
/// `rejected` are terminal review outcomes; `edited` keeps the reply in
/// the queue with new text. `generated` and `edited` replies are the only
/// ones eligible for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Generated,
    Approved,
    Rejected,
    Edited,
    Evaluated,
}

impl ReplyStatus {
    /// Whether a reply with this status sits in the approval queue and is
    /// eligible for evaluation.
    pub fn awaiting_review(&self) -> bool {
        matches!(self, Self::Generated | Self::Edited)
    }
}

impl std::fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Edited => write!(f, "edited"),
            Self::Evaluated => write!(f, "evaluated"),
        }
    }
}

impl std::str::FromStr for ReplyStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "edited" => Ok(Self::Edited),
            "evaluated" => Ok(Self::Evaluated),
            _ => Err(format!("Unknown reply status: {}", s)),
        }
    }
}

/// A collected post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Surrogate id.
    pub id: Uuid,
    /// Platform-native tweet id. Unique across the store.
    pub external_id: String,
    /// Post text as collected.
    pub text: String,
    /// Author handle without the leading `@`.
    pub author_handle: String,
    /// Collection channel.
    pub source: PostSource,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
    /// Relevance filter score in [0, 1].
    pub relevance_score: f64,
    pub status: PostStatus,
    pub imported_at: DateTime<Utc>,
}

impl Post {
    /// Create a freshly collected post with zeroed engagement.
    pub fn new(
        external_id: impl Into<String>,
        text: impl Into<String>,
        author_handle: impl Into<String>,
        source: PostSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            text: text.into(),
            author_handle: author_handle.into(),
            source,
            like_count: 0,
            retweet_count: 0,
            reply_count: 0,
            relevance_score: 0.0,
            status: PostStatus::Collected,
            imported_at: Utc::now(),
        }
    }

    /// Set engagement counters. Negative inputs clamp to zero.
    pub fn with_engagement(mut self, likes: i64, retweets: i64, replies: i64) -> Self {
        self.like_count = likes.max(0);
        self.retweet_count = retweets.max(0);
        self.reply_count = replies.max(0);
        self
    }

    /// Set the relevance score, clamped into [0, 1].
    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }

    /// Set the lifecycle status.
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }
}

/// A drafted reply awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    /// The post this reply answers.
    pub post_id: Uuid,
    /// Persona the reply was voiced as.
    pub persona: PersonaKey,
    /// Reply text, display-capped at 280 characters.
    pub text: String,
    pub status: ReplyStatus,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    /// Create a new generated reply.
    pub fn new(post_id: Uuid, persona: PersonaKey, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            persona,
            text: text.into(),
            status: ReplyStatus::Generated,
            created_at: Utc::now(),
        }
    }
}

/// Quality scores for one reply. At most one evaluation exists per reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub reply_id: Uuid,
    /// How well the reply addresses the post, in [0, 1].
    pub relevance: f64,
    /// How well the reply matches the persona voice, in [0, 1].
    pub tone_accuracy: f64,
    /// How much substance the reply adds, in [0, 1].
    pub value_add: f64,
    /// Expected engagement pull, in [0, 1].
    pub engagement_potential: f64,
    pub predicted_likes: i64,
    pub predicted_retweets: i64,
    pub predicted_replies: i64,
    /// Audit payload: the scorer's raw output.
    pub raw: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    /// Create an evaluation with the four sub-scores clamped into [0, 1].
    pub fn new(
        reply_id: Uuid,
        relevance: f64,
        tone_accuracy: f64,
        value_add: f64,
        engagement_potential: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reply_id,
            relevance: relevance.clamp(0.0, 1.0),
            tone_accuracy: tone_accuracy.clamp(0.0, 1.0),
            value_add: value_add.clamp(0.0, 1.0),
            engagement_potential: engagement_potential.clamp(0.0, 1.0),
            predicted_likes: 0,
            predicted_retweets: 0,
            predicted_replies: 0,
            raw: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Set predicted engagement counters. Negative inputs clamp to zero.
    pub fn with_predictions(mut self, likes: i64, retweets: i64, replies: i64) -> Self {
        self.predicted_likes = likes.max(0);
        self.predicted_retweets = retweets.max(0);
        self.predicted_replies = replies.max(0);
        self
    }

    /// Attach the scorer's raw output for auditing.
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }
}

/// A generated report and the paths of its artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    /// Report kind, e.g. "weekly".
    pub report_type: String,
    /// Path of the Markdown narrative.
    pub summary_path: String,
    /// Path of the per-post CSV export.
    pub csv_path: String,
    /// Structured summary payload.
    pub insights: serde_json::Value,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        report_type: impl Into<String>,
        summary_path: impl Into<String>,
        csv_path: impl Into<String>,
        insights: serde_json::Value,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_type: report_type.into(),
            summary_path: summary_path.into(),
            csv_path: csv_path.into(),
            insights,
            period_start,
            period_end,
            created_at: Utc::now(),
        }
    }
}

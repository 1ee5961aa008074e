//! The `RecordStore` trait: one async interface over all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::model::{Evaluation, Post, PostStatus, Reply, ReplyStatus, Report};

/// Backend-agnostic store for posts, replies, evaluations, and reports.
///
/// Lookups return `Ok(None)` for missing records; callers decide whether
/// absence is an error. Mutations on absent ids are silent no-ops, so
/// callers that need existence guarantees fetch first.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ── Posts ───────────────────────────────────────────────────────

    /// Insert a post. Fails with `Constraint` when the external id exists.
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// Look up a post by its platform-native tweet id.
    async fn find_post_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Post>, StoreError>;

    async fn update_post_status(&self, id: Uuid, status: PostStatus) -> Result<(), StoreError>;

    /// Posts with the given status, newest first.
    async fn posts_with_status(&self, status: PostStatus) -> Result<Vec<Post>, StoreError>;

    /// Posts imported at or after `cutoff`, oldest first.
    async fn posts_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>, StoreError>;

    // ── Replies ─────────────────────────────────────────────────────

    async fn insert_reply(&self, reply: &Reply) -> Result<(), StoreError>;

    async fn get_reply(&self, id: Uuid) -> Result<Option<Reply>, StoreError>;

    /// Replies whose status is in `statuses`, oldest first.
    async fn replies_with_status(
        &self,
        statuses: &[ReplyStatus],
    ) -> Result<Vec<Reply>, StoreError>;

    /// All replies drafted for a post, oldest first.
    async fn replies_for_post(&self, post_id: Uuid) -> Result<Vec<Reply>, StoreError>;

    async fn update_reply_status(&self, id: Uuid, status: ReplyStatus) -> Result<(), StoreError>;

    /// Replace a reply's text and status in one step.
    async fn update_reply_text(
        &self,
        id: Uuid,
        text: &str,
        status: ReplyStatus,
    ) -> Result<(), StoreError>;

    // ── Evaluations ─────────────────────────────────────────────────

    /// Insert an evaluation. Fails with `Constraint` when the reply
    /// already has one.
    async fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), StoreError>;

    async fn find_evaluation(&self, reply_id: Uuid) -> Result<Option<Evaluation>, StoreError>;

    // ── Reports ─────────────────────────────────────────────────────

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError>;
}

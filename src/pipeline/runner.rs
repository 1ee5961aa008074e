//! Batch orchestration: ingest, draft, evaluate. Sequential loops with
//! per-item failure isolation; one bad post never aborts the run.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{Result, ValidationError};
use crate::filter::evaluate_relevance;
use crate::personas::PersonaKey;
use crate::pipeline::drafter::ReplyDrafter;
use crate::pipeline::evaluator::ReplyEvaluator;
use crate::store::{Post, PostStatus, RecordStore, Reply, ReplyStatus};

/// Counts for one batch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items handled to completion.
    pub processed: usize,
    /// Items intentionally left alone (duplicates, already handled).
    pub skipped: usize,
    /// Items that errored; the loop moved on.
    pub failed: usize,
}

/// Runs the pipeline stages over whatever work is pending in the store.
pub struct PipelineRunner {
    store: Arc<dyn RecordStore>,
    keywords: Vec<String>,
    hashtags: Vec<String>,
    drafter: ReplyDrafter,
    evaluator: ReplyEvaluator,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        settings: &Settings,
        drafter: ReplyDrafter,
        evaluator: ReplyEvaluator,
    ) -> Self {
        Self {
            store,
            keywords: settings.keywords.clone(),
            hashtags: settings.hashtags.clone(),
            drafter,
            evaluator,
        }
    }

    /// Score and persist freshly collected posts. Posts whose external id
    /// is already stored are skipped, not re-scored.
    pub async fn ingest(&self, posts: Vec<Post>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for post in posts {
            let external_id = post.external_id.clone();
            match self.ingest_one(post).await {
                Ok(true) => outcome.processed += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!(external_id = %external_id, error = %e, "Failed to ingest post");
                    outcome.failed += 1;
                }
            }
        }
        tracing::info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Ingest pass complete"
        );
        outcome
    }

    async fn ingest_one(&self, post: Post) -> Result<bool> {
        if self
            .store
            .find_post_by_external_id(&post.external_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let filter = evaluate_relevance(&post.text, &self.keywords, &self.hashtags);
        let status = if filter.matched {
            PostStatus::FilteredIn
        } else {
            PostStatus::FilteredOut
        };
        let post = post.with_relevance(filter.relevance_score).with_status(status);
        self.store.insert_post(&post).await?;

        tracing::debug!(
            external_id = %post.external_id,
            status = %status,
            score = filter.relevance_score,
            "Ingested post"
        );
        Ok(true)
    }

    /// Draft replies for `filtered_in` posts, newest first. Posts that
    /// already have a reply are skipped.
    ///
    /// A bad persona override aborts up front; it would fail every item
    /// identically.
    pub async fn generate_pending(&self, persona_override: Option<&str>) -> Result<BatchOutcome> {
        if let Some(raw) = persona_override
            && raw.parse::<PersonaKey>().is_err()
        {
            return Err(ValidationError::UnknownPersona {
                name: raw.to_string(),
            }
            .into());
        }

        let posts = self.store.posts_with_status(PostStatus::FilteredIn).await?;
        let mut outcome = BatchOutcome::default();
        for post in posts {
            match self.generate_one(&post, persona_override).await {
                Ok(true) => outcome.processed += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!(post_id = %post.id, error = %e, "Failed to draft reply");
                    outcome.failed += 1;
                }
            }
        }
        tracing::info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Draft pass complete"
        );
        Ok(outcome)
    }

    async fn generate_one(&self, post: &Post, persona_override: Option<&str>) -> Result<bool> {
        if !self.store.replies_for_post(post.id).await?.is_empty() {
            return Ok(false);
        }
        self.drafter.generate_reply(post, persona_override).await?;
        Ok(true)
    }

    /// Evaluate replies awaiting review, oldest first. Replies that
    /// already carry an evaluation are skipped.
    pub async fn evaluate_pending(&self) -> Result<BatchOutcome> {
        let replies = self
            .store
            .replies_with_status(&[ReplyStatus::Generated, ReplyStatus::Edited])
            .await?;
        let mut outcome = BatchOutcome::default();
        for reply in replies {
            match self.evaluate_one(&reply).await {
                Ok(true) => outcome.processed += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!(reply_id = %reply.id, error = %e, "Failed to evaluate reply");
                    outcome.failed += 1;
                }
            }
        }
        tracing::info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Evaluation pass complete"
        );
        Ok(outcome)
    }

    async fn evaluate_one(&self, reply: &Reply) -> Result<bool> {
        if self.store.find_evaluation(reply.id).await?.is_some() {
            return Ok(false);
        }
        self.evaluator.evaluate_reply(reply).await?;
        Ok(true)
    }
}

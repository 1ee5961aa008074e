//! Approval queue: human review actions over drafted replies.
//!
//! Replies with status `generated` or `edited` sit in the queue.
//! Approve and reject are terminal; edit rewrites the text and keeps the
//! reply queued; regenerate retires the old reply and drafts a fresh one.
//! Nothing is ever posted anywhere from here.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StoreError, ValidationError};
use crate::personas::PersonaKey;
use crate::pipeline::ReplyDrafter;
use crate::pipeline::drafter::normalize_reply;
use crate::store::{RecordStore, Reply, ReplyStatus};

/// A parsed review action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAction {
    Show,
    Approve { reply_id: Uuid },
    Reject { reply_id: Uuid },
    Edit { reply_id: Uuid, text: String },
    Regenerate { reply_id: Uuid, persona: Option<String> },
}

impl QueueAction {
    /// Assemble an action from loose command-line arguments. Everything
    /// except `show` needs a reply id; `edit` also needs non-empty text.
    pub fn from_parts(
        action: &str,
        reply_id: Option<Uuid>,
        text: Option<String>,
        persona: Option<String>,
    ) -> std::result::Result<Self, ValidationError> {
        let require_id = || {
            reply_id.ok_or_else(|| ValidationError::MissingField {
                field: "reply-id".into(),
            })
        };
        match action {
            "show" => Ok(Self::Show),
            "approve" => Ok(Self::Approve {
                reply_id: require_id()?,
            }),
            "reject" => Ok(Self::Reject {
                reply_id: require_id()?,
            }),
            "edit" => Ok(Self::Edit {
                reply_id: require_id()?,
                text: text
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| ValidationError::MissingField {
                        field: "text".into(),
                    })?,
            }),
            "regenerate" => Ok(Self::Regenerate {
                reply_id: require_id()?,
                persona,
            }),
            other => Err(ValidationError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

/// Store-backed review queue.
pub struct ApprovalQueue {
    store: Arc<dyn RecordStore>,
    drafter: ReplyDrafter,
}

impl ApprovalQueue {
    pub fn new(store: Arc<dyn RecordStore>, drafter: ReplyDrafter) -> Self {
        Self { store, drafter }
    }

    /// Replies awaiting review, oldest first.
    pub async fn pending(&self) -> Result<Vec<Reply>> {
        Ok(self
            .store
            .replies_with_status(&[ReplyStatus::Generated, ReplyStatus::Edited])
            .await?)
    }

    /// Approve a queued reply.
    pub async fn approve(&self, reply_id: Uuid) -> Result<Reply> {
        let mut reply = self.fetch_awaiting(reply_id).await?;
        self.store
            .update_reply_status(reply_id, ReplyStatus::Approved)
            .await?;
        reply.status = ReplyStatus::Approved;
        info!(reply_id = %reply_id, "Reply approved");
        Ok(reply)
    }

    /// Reject a queued reply.
    pub async fn reject(&self, reply_id: Uuid) -> Result<Reply> {
        let mut reply = self.fetch_awaiting(reply_id).await?;
        self.store
            .update_reply_status(reply_id, ReplyStatus::Rejected)
            .await?;
        reply.status = ReplyStatus::Rejected;
        info!(reply_id = %reply_id, "Reply rejected");
        Ok(reply)
    }

    /// Replace a queued reply's text. The new text goes through the same
    /// normalization and cap as drafted text, and the reply stays queued
    /// with status `edited`.
    pub async fn edit(&self, reply_id: Uuid, text: &str) -> Result<Reply> {
        if text.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "text".into(),
            }
            .into());
        }
        let mut reply = self.fetch_awaiting(reply_id).await?;
        let normalized = normalize_reply(text);
        self.store
            .update_reply_text(reply_id, &normalized, ReplyStatus::Edited)
            .await?;
        reply.text = normalized;
        reply.status = ReplyStatus::Edited;
        info!(reply_id = %reply_id, "Reply edited");
        Ok(reply)
    }

    /// Draft a replacement reply for the same post, honoring an optional
    /// persona override, and retire the old reply as `rejected`. The old
    /// record keeps its text for the audit trail.
    pub async fn regenerate(&self, reply_id: Uuid, persona: Option<&str>) -> Result<Reply> {
        // Validate the override before touching anything; a typo must
        // not retire the existing draft.
        if let Some(raw) = persona
            && raw.parse::<PersonaKey>().is_err()
        {
            return Err(ValidationError::UnknownPersona {
                name: raw.to_string(),
            }
            .into());
        }

        let old = self.fetch_awaiting(reply_id).await?;
        let post = self
            .store
            .get_post(old.post_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "post".into(),
                id: old.post_id.to_string(),
            })?;

        let fresh = self.drafter.generate_reply(&post, persona).await?;
        self.store
            .update_reply_status(reply_id, ReplyStatus::Rejected)
            .await?;
        info!(
            old_reply_id = %reply_id,
            new_reply_id = %fresh.id,
            persona = %fresh.persona,
            "Reply regenerated"
        );
        Ok(fresh)
    }

    /// Fetch a reply and insist it is still reviewable.
    async fn fetch_awaiting(&self, reply_id: Uuid) -> Result<Reply> {
        let reply = self
            .store
            .get_reply(reply_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "reply".into(),
                id: reply_id.to_string(),
            })?;
        if !reply.status.awaiting_review() {
            return Err(ValidationError::InvalidReplyStatus {
                id: reply_id,
                status: reply.status.to_string(),
                expected: "generated or edited".into(),
            }
            .into());
        }
        Ok(reply)
    }
}

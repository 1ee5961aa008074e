//! Reply drafting: persona-voiced text via the chat model, or the
//! deterministic offline templates when no model is configured.

use std::sync::Arc;

use crate::error::Result;
use crate::llm::{ChatMessage, CompletionRequest, ModelBackend};
use crate::personas::{PersonaCatalog, PersonaKey};
use crate::store::{Post, PostStatus, RecordStore, Reply};

/// Display cap for reply text.
pub const REPLY_CHAR_CAP: usize = 280;

/// Sampling temperature for drafting. High enough for voice variety.
const DRAFT_TEMPERATURE: f32 = 0.7;

/// How many characters of the source post the offline templates echo.
const ECHO_CHARS: usize = 80;

/// Drafts one reply per post and records it.
pub struct ReplyDrafter {
    store: Arc<dyn RecordStore>,
    catalog: PersonaCatalog,
    backend: ModelBackend,
}

impl ReplyDrafter {
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: PersonaCatalog,
        backend: ModelBackend,
    ) -> Self {
        Self {
            store,
            catalog,
            backend,
        }
    }

    /// Draft, normalize, and persist a reply for `post`, advancing the
    /// post to `reply_generated`.
    ///
    /// The offline templates are an explicit mode, not error recovery: a
    /// failing configured model surfaces its error instead of silently
    /// substituting a template.
    pub async fn generate_reply(
        &self,
        post: &Post,
        persona_override: Option<&str>,
    ) -> Result<Reply> {
        let persona = self.catalog.select(&post.text, persona_override)?;

        let raw = match &self.backend {
            ModelBackend::Configured(model) => {
                let request = CompletionRequest::new(vec![
                    ChatMessage::system(self.catalog.profile(persona).voice_prompt),
                    ChatMessage::user(format!(
                        "Draft one reply under 280 characters for this tweet. \
                         No hashtags unless absolutely needed.\n\nTweet: {}",
                        post.text
                    )),
                ])
                .with_temperature(DRAFT_TEMPERATURE);
                model.complete(request).await?.content
            }
            ModelBackend::Offline => fallback_draft(persona, &post.text),
        };

        let reply = Reply::new(post.id, persona, normalize_reply(&raw));
        self.store.insert_reply(&reply).await?;
        self.store
            .update_post_status(post.id, PostStatus::ReplyGenerated)
            .await?;

        tracing::debug!(
            reply_id = %reply.id,
            post_id = %post.id,
            persona = %persona,
            strategy = self.backend.strategy_name(),
            "Drafted reply"
        );
        Ok(reply)
    }
}

/// Deterministic offline draft: a fixed persona line plus an echo of the
/// start of the post.
fn fallback_draft(persona: PersonaKey, post_text: &str) -> String {
    let base = match persona {
        PersonaKey::ProfessionalAnalyst => {
            "Useful angle: monitor liquidity, positioning, and downside risk \
             before drawing conclusions."
        }
        PersonaKey::CasualDegen => {
            "Low-key interesting setup 👀 worth tracking on-chain before anyone \
             gets too loud. NFA."
        }
        PersonaKey::NeutralResearcher => {
            "Interesting claim. Which dataset and timeframe support this conclusion?"
        }
    };
    let echo: String = post_text.chars().take(ECHO_CHARS).collect();
    format!("{base} ({echo})")
}

/// Collapse whitespace runs to single spaces and trim; text past the cap
/// is cut to 277 characters, right-trimmed, and closed with `...`.
pub fn normalize_reply(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= REPLY_CHAR_CAP {
        return collapsed;
    }
    let head: String = collapsed.chars().take(REPLY_CHAR_CAP - 3).collect();
    let mut text = head.trim_end().to_string();
    text.push_str("...");
    text
}

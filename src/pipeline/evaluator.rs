//! Reply quality scoring: strict-JSON model calls or the deterministic
//! length-and-persona heuristic.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::llm::{ChatMessage, CompletionRequest, ModelBackend, extract_json_object};
use crate::personas::PersonaKey;
use crate::store::{Evaluation, RecordStore, Reply, ReplyStatus};

/// Sampling temperature for scoring. Low, scoring should be stable.
const EVALUATION_TEMPERATURE: f32 = 0.2;

const EVALUATION_SYSTEM_PROMPT: &str = "Evaluate tweet reply quality. Return strict JSON \
     with keys: relevance, tone_accuracy, value_added, engagement_potential, \
     predicted_likes, predicted_retweets, predicted_replies. Scores 0-1.";

/// The scorer's JSON schema. Every key is required; a payload missing
/// any of them is an invalid response, not a zero.
#[derive(Debug, Deserialize)]
struct ScorePayload {
    relevance: f64,
    tone_accuracy: f64,
    value_added: f64,
    engagement_potential: f64,
    predicted_likes: i64,
    predicted_retweets: i64,
    predicted_replies: i64,
}

/// Scores drafted replies and records the evaluation.
pub struct ReplyEvaluator {
    store: Arc<dyn RecordStore>,
    backend: ModelBackend,
}

impl ReplyEvaluator {
    pub fn new(store: Arc<dyn RecordStore>, backend: ModelBackend) -> Self {
        Self { store, backend }
    }

    /// Score `reply`, persist the evaluation, and mark the reply
    /// `evaluated`.
    ///
    /// Does not re-check eligibility; callers filter out replies that
    /// already carry an evaluation. The store's uniqueness constraint
    /// backstops a caller that forgets.
    pub async fn evaluate_reply(&self, reply: &Reply) -> Result<Evaluation> {
        let evaluation = match &self.backend {
            ModelBackend::Configured(model) => {
                let request = CompletionRequest::new(vec![
                    ChatMessage::system(EVALUATION_SYSTEM_PROMPT),
                    ChatMessage::user(format!(
                        "Persona: {}\nReply: {}",
                        reply.persona, reply.text
                    )),
                ])
                .with_temperature(EVALUATION_TEMPERATURE)
                .with_json_output();

                let content = model.complete(request).await?.content;
                let raw: serde_json::Value = serde_json::from_str(&extract_json_object(&content))
                    .map_err(|e| ModelError::InvalidResponse {
                        reason: format!("evaluation is not JSON: {e}"),
                    })?;
                let scores: ScorePayload = serde_json::from_value(raw.clone()).map_err(|e| {
                    ModelError::InvalidResponse {
                        reason: format!("evaluation payload: {e}"),
                    }
                })?;

                Evaluation::new(
                    reply.id,
                    scores.relevance,
                    scores.tone_accuracy,
                    scores.value_added,
                    scores.engagement_potential,
                )
                .with_predictions(
                    scores.predicted_likes,
                    scores.predicted_retweets,
                    scores.predicted_replies,
                )
                .with_raw(raw)
            }
            ModelBackend::Offline => heuristic_evaluation(reply),
        };

        self.store.insert_evaluation(&evaluation).await?;
        self.store
            .update_reply_status(reply.id, ReplyStatus::Evaluated)
            .await?;

        tracing::debug!(
            reply_id = %reply.id,
            relevance = evaluation.relevance,
            strategy = self.backend.strategy_name(),
            "Evaluated reply"
        );
        Ok(evaluation)
    }
}

/// Deterministic score from reply length and persona. Longer replies
/// score higher up to the display cap; the analyst voice gets a small
/// bonus; everything tops out at 0.97.
fn heuristic_evaluation(reply: &Reply) -> Evaluation {
    let length_factor = (reply.text.chars().count() as f64 / 280.0).min(1.0);
    let base = 0.55 + 0.35 * length_factor;
    let bonus = if reply.persona == PersonaKey::ProfessionalAnalyst {
        0.05
    } else {
        0.0
    };
    let score = (base + bonus).min(0.97);

    let raw = serde_json::json!({
        "strategy": "heuristic",
        "length_factor": length_factor,
        "score": score,
    });

    Evaluation::new(
        reply.id,
        round2(score),
        round2(score - 0.03),
        round2(score - 0.06),
        round2(score - 0.02),
    )
    .with_predictions(
        (8.0 + 40.0 * score) as i64,
        (2.0 + 12.0 * score) as i64,
        (1.0 + 9.0 * score) as i64,
    )
    .with_raw(raw)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::{CompletionModel, CompletionResponse};
    use crate::store::{LibSqlStore, Post, PostSource};
    use uuid::Uuid;

    struct JsonModel {
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl CompletionModel for JsonModel {
        fn model_name(&self) -> &str {
            "json-test-model"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ModelError> {
            Ok(CompletionResponse {
                content: self.body.to_string(),
            })
        }
    }

    fn make_reply(text: &str, persona: PersonaKey) -> Reply {
        Reply::new(Uuid::new_v4(), persona, text)
    }

    async fn store_with_reply(
        text: &str,
        persona: PersonaKey,
    ) -> (Arc<dyn RecordStore>, Reply) {
        let store: Arc<dyn RecordStore> =
            Arc::new(LibSqlStore::new_memory().await.unwrap());
        let post = Post::new("4242424242", "source post", "author", PostSource::Simulation);
        store.insert_post(&post).await.unwrap();
        let reply = Reply::new(post.id, persona, text);
        store.insert_reply(&reply).await.unwrap();
        (store, reply)
    }

    // ── Heuristic vectors ───────────────────────────────────────────

    #[test]
    fn heuristic_hundred_char_degen_reply() {
        let reply = make_reply(&"x".repeat(100), PersonaKey::CasualDegen);
        let eval = heuristic_evaluation(&reply);
        assert_eq!(eval.relevance, 0.68);
        assert_eq!(eval.tone_accuracy, 0.65);
        assert_eq!(eval.value_add, 0.62);
        assert_eq!(eval.engagement_potential, 0.66);
        assert_eq!(eval.predicted_likes, 35);
        assert_eq!(eval.predicted_retweets, 10);
        assert_eq!(eval.predicted_replies, 7);
    }

    #[test]
    fn heuristic_long_analyst_reply_gets_bonus() {
        let reply = make_reply(&"y".repeat(300), PersonaKey::ProfessionalAnalyst);
        let eval = heuristic_evaluation(&reply);
        assert_eq!(eval.relevance, 0.95);
        assert_eq!(eval.tone_accuracy, 0.92);
        assert_eq!(eval.value_add, 0.89);
        assert_eq!(eval.engagement_potential, 0.93);
        assert_eq!(eval.predicted_likes, 46);
        assert_eq!(eval.predicted_retweets, 13);
        assert_eq!(eval.predicted_replies, 9);
    }

    #[test]
    fn heuristic_empty_reply_floors_at_base() {
        let reply = make_reply("", PersonaKey::NeutralResearcher);
        let eval = heuristic_evaluation(&reply);
        assert_eq!(eval.relevance, 0.55);
        assert_eq!(eval.tone_accuracy, 0.52);
        assert_eq!(eval.value_add, 0.49);
        assert_eq!(eval.engagement_potential, 0.53);
        assert_eq!(eval.predicted_likes, 30);
        assert_eq!(eval.predicted_retweets, 8);
        assert_eq!(eval.predicted_replies, 5);
    }

    #[test]
    fn heuristic_is_idempotent() {
        let reply = make_reply("gm, on-chain looks spicy today", PersonaKey::CasualDegen);
        let a = heuristic_evaluation(&reply);
        let b = heuristic_evaluation(&reply);
        assert_eq!(a.relevance, b.relevance);
        assert_eq!(a.tone_accuracy, b.tone_accuracy);
        assert_eq!(a.value_add, b.value_add);
        assert_eq!(a.engagement_potential, b.engagement_potential);
        assert_eq!(a.predicted_likes, b.predicted_likes);
    }

    // ── Offline full path ───────────────────────────────────────────

    #[tokio::test]
    async fn offline_evaluation_persists_and_marks_reply() {
        let (store, reply) = store_with_reply("a solid reply", PersonaKey::CasualDegen).await;
        let evaluator = ReplyEvaluator::new(store.clone(), ModelBackend::Offline);

        let eval = evaluator.evaluate_reply(&reply).await.unwrap();
        assert_eq!(eval.reply_id, reply.id);

        let found = store.find_evaluation(reply.id).await.unwrap().unwrap();
        assert_eq!(found.relevance, eval.relevance);
        assert_eq!(found.raw["strategy"], "heuristic");

        let reply = store.get_reply(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.status, ReplyStatus::Evaluated);
    }

    // ── Configured path ─────────────────────────────────────────────

    #[tokio::test]
    async fn configured_parses_fenced_json() {
        let (store, reply) = store_with_reply("model reply", PersonaKey::CasualDegen).await;
        let model = Arc::new(JsonModel {
            body: "```json\n{\"relevance\": 0.8, \"tone_accuracy\": 0.7, \
                   \"value_added\": 0.6, \"engagement_potential\": 0.75, \
                   \"predicted_likes\": 12, \"predicted_retweets\": 3, \
                   \"predicted_replies\": 2}\n```",
        });
        let evaluator = ReplyEvaluator::new(store.clone(), ModelBackend::configured(model));

        let eval = evaluator.evaluate_reply(&reply).await.unwrap();
        assert_eq!(eval.relevance, 0.8);
        assert_eq!(eval.predicted_likes, 12);
        assert_eq!(eval.raw["tone_accuracy"], 0.7);

        let reply = store.get_reply(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.status, ReplyStatus::Evaluated);
    }

    #[tokio::test]
    async fn configured_rejects_non_json_output() {
        let (store, reply) = store_with_reply("model reply", PersonaKey::CasualDegen).await;
        let model = Arc::new(JsonModel {
            body: "Honestly this reply is pretty good!",
        });
        let evaluator = ReplyEvaluator::new(store.clone(), ModelBackend::configured(model));

        let err = evaluator.evaluate_reply(&reply).await;
        assert!(matches!(
            err,
            Err(Error::Model(ModelError::InvalidResponse { .. }))
        ));

        assert!(store.find_evaluation(reply.id).await.unwrap().is_none());
        let reply = store.get_reply(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.status, ReplyStatus::Generated);
    }

    #[tokio::test]
    async fn configured_rejects_missing_keys() {
        let (store, reply) = store_with_reply("model reply", PersonaKey::CasualDegen).await;
        let model = Arc::new(JsonModel {
            body: "{\"relevance\": 0.8, \"tone_accuracy\": 0.7}",
        });
        let evaluator = ReplyEvaluator::new(store, ModelBackend::configured(model));

        let err = evaluator.evaluate_reply(&reply).await;
        assert!(matches!(
            err,
            Err(Error::Model(ModelError::InvalidResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn configured_clamps_out_of_range_values() {
        let (store, reply) = store_with_reply("model reply", PersonaKey::CasualDegen).await;
        let model = Arc::new(JsonModel {
            body: "{\"relevance\": 1.4, \"tone_accuracy\": -0.2, \
                   \"value_added\": 0.5, \"engagement_potential\": 0.5, \
                   \"predicted_likes\": -9, \"predicted_retweets\": 1, \
                   \"predicted_replies\": 0}",
        });
        let evaluator = ReplyEvaluator::new(store, ModelBackend::configured(model));

        let eval = evaluator.evaluate_reply(&reply).await.unwrap();
        assert_eq!(eval.relevance, 1.0);
        assert_eq!(eval.tone_accuracy, 0.0);
        assert_eq!(eval.predicted_likes, 0);
    }
}

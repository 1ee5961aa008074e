//! Narrative summaries over a batch of collected posts.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::llm::{ChatMessage, CompletionRequest, ModelBackend, extract_json_object};
use crate::store::Post;

/// Sampling temperature for the narrative call.
const SUMMARY_TEMPERATURE: f32 = 0.4;

/// At most this many post lines go into the prompt.
const MAX_SUMMARY_LINES: usize = 50;

const SUMMARY_SYSTEM_PROMPT: &str = "Return strict JSON with keys: executive_summary, \
     sentiment, trends, risks. No markdown, no extra keys.";

/// Structured digest of a reporting period. All keys are required when
/// parsing model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub executive_summary: String,
    pub sentiment: String,
    pub trends: Vec<String>,
    pub risks: Vec<String>,
}

/// Produces period summaries, via the model or the word-frequency digest.
pub struct Summarizer {
    backend: ModelBackend,
}

impl Summarizer {
    pub fn new(backend: ModelBackend) -> Self {
        Self { backend }
    }

    /// Summarize a batch of posts. An empty batch yields a fixed neutral
    /// summary without calling anything.
    pub async fn summarize(&self, posts: &[Post]) -> Result<Summary> {
        if posts.is_empty() {
            return Ok(Summary {
                executive_summary: "No tweets in the selected period.".into(),
                sentiment: "neutral".into(),
                trends: Vec::new(),
                risks: Vec::new(),
            });
        }

        match &self.backend {
            ModelBackend::Configured(model) => {
                let lines: Vec<String> = posts
                    .iter()
                    .take(MAX_SUMMARY_LINES)
                    .map(|p| format!("- {}", p.text))
                    .collect();
                let request = CompletionRequest::new(vec![
                    ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                    ChatMessage::user(format!("Tweets:\n{}", lines.join("\n"))),
                ])
                .with_temperature(SUMMARY_TEMPERATURE)
                .with_json_output();

                let content = model.complete(request).await?.content;
                let summary: Summary = serde_json::from_str(&extract_json_object(&content))
                    .map_err(|e| ModelError::InvalidResponse {
                        reason: format!("summary is not JSON: {e}"),
                    })?;
                Ok(summary)
            }
            ModelBackend::Offline => Ok(fallback_summary(posts)),
        }
    }
}

/// Deterministic digest: top recurring words become the trends list.
fn fallback_summary(posts: &[Post]) -> Summary {
    Summary {
        executive_summary: format!(
            "Analyzed {} tweets focused on crypto market narratives.",
            posts.len()
        ),
        sentiment: "mixed".into(),
        trends: word_frequency_trends(posts),
        risks: vec![
            "Volatility spikes".into(),
            "Narrative-driven overreaction".into(),
        ],
    }
}

/// Count words longer than four characters (measured before stripping
/// edge punctuation), case-folded, and return the five most frequent.
/// Ties keep first-seen order.
fn word_frequency_trends(posts: &[Post]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for post in posts {
        for raw in post.text.split_whitespace() {
            if raw.chars().count() <= 4 {
                continue;
            }
            let word = raw
                .trim_matches(|c| ".,!?():;".contains(c))
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|(w, _)| *w == word) {
                Some((_, n)) => *n += 1,
                None => counts.push((word, 1)),
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(5).map(|(w, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::error::Error;
    use crate::llm::{CompletionModel, CompletionResponse};
    use crate::store::PostSource;

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

    struct CapturingModel {
        seen_user_content: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl CompletionModel for CapturingModel {
        fn model_name(&self) -> &str {
            "capturing-test-model"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ModelError> {
            let user = request
                .messages
                .iter()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone());
            *self.seen_user_content.lock().unwrap() = user;
            Ok(CompletionResponse {
                content: "{\"executive_summary\": \"s\", \"sentiment\": \"mixed\", \
                          \"trends\": [], \"risks\": []}"
                    .to_string(),
            })
        }
    }

    fn post(text: &str) -> Post {
        Post::new(uuid::Uuid::new_v4().simple().to_string(), text, "t", PostSource::Simulation)
    }

    // ── Fallback digest ─────────────────────────────────────────────

    #[tokio::test]
    async fn empty_batch_gets_fixed_neutral_summary() {
        let summarizer = Summarizer::new(ModelBackend::Offline);
        let summary = summarizer.summarize(&[]).await.unwrap();
        assert_eq!(summary.executive_summary, "No tweets in the selected period.");
        assert_eq!(summary.sentiment, "neutral");
        assert!(summary.trends.is_empty());
        assert!(summary.risks.is_empty());
    }

    #[tokio::test]
    async fn fallback_ranks_words_by_frequency() {
        let posts = vec![
            post("Liquidity rotating into rollups. Liquidity premium compresses."),
            post("Rollups settle fast. Premium narratives fade."),
        ];
        let summarizer = Summarizer::new(ModelBackend::Offline);
        let summary = summarizer.summarize(&posts).await.unwrap();

        assert_eq!(
            summary.executive_summary,
            "Analyzed 2 tweets focused on crypto market narratives."
        );
        assert_eq!(summary.sentiment, "mixed");
        assert_eq!(
            summary.trends,
            vec!["liquidity", "rollups", "premium", "rotating", "compresses"]
        );
        assert_eq!(
            summary.risks,
            vec!["Volatility spikes", "Narrative-driven overreaction"]
        );
    }

    #[test]
    fn short_words_never_become_trends() {
        let posts = vec![post("BTC ETH SOL up gm"), post("up up BTC")];
        assert!(word_frequency_trends(&posts).is_empty());
    }

    #[test]
    fn length_rule_applies_before_punctuation_strip() {
        // "fast." is five characters raw, four after the strip; it counts.
        let posts = vec![post("fast. fast. fast")];
        assert_eq!(word_frequency_trends(&posts), vec!["fast"]);
    }

    #[test]
    fn tied_counts_keep_first_seen_order() {
        let posts = vec![post("alpha gamma"), post("gamma alpha")];
        assert_eq!(word_frequency_trends(&posts), vec!["alpha", "gamma"]);
    }

    #[test]
    fn trends_cap_at_five() {
        let posts = vec![post(
            "mondays tuesday wednesday thursday fridays saturday sundays",
        )];
        let trends = word_frequency_trends(&posts);
        assert_eq!(
            trends,
            vec!["mondays", "tuesday", "wednesday", "thursday", "fridays"]
        );
    }

    // ── Configured path ─────────────────────────────────────────────

    #[tokio::test]
    async fn configured_parses_strict_json() {
        let model = Arc::new(JsonModel {
            body: "```json\n{\"executive_summary\": \"Rotation week.\", \
                   \"sentiment\": \"bullish\", \"trends\": [\"rollups\"], \
                   \"risks\": [\"leverage\"]}\n```",
        });
        let summarizer = Summarizer::new(ModelBackend::configured(model));

        let summary = summarizer.summarize(&[post("anything")]).await.unwrap();
        assert_eq!(summary.executive_summary, "Rotation week.");
        assert_eq!(summary.sentiment, "bullish");
        assert_eq!(summary.trends, vec!["rollups"]);
        assert_eq!(summary.risks, vec!["leverage"]);
    }

    #[tokio::test]
    async fn configured_rejects_non_json_output() {
        let model = Arc::new(JsonModel {
            body: "This week was mostly about rollups.",
        });
        let summarizer = Summarizer::new(ModelBackend::configured(model));

        let err = summarizer.summarize(&[post("anything")]).await;
        assert!(matches!(
            err,
            Err(Error::Model(ModelError::InvalidResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn configured_rejects_missing_keys() {
        let model = Arc::new(JsonModel {
            body: "{\"executive_summary\": \"Rotation week.\"}",
        });
        let summarizer = Summarizer::new(ModelBackend::configured(model));

        let err = summarizer.summarize(&[post("anything")]).await;
        assert!(matches!(
            err,
            Err(Error::Model(ModelError::InvalidResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn prompt_carries_at_most_fifty_lines() {
        let model = Arc::new(CapturingModel {
            seen_user_content: Mutex::new(None),
        });
        let summarizer = Summarizer::new(ModelBackend::configured(model.clone()));

        let posts: Vec<Post> = (0..60).map(|i| post(&format!("post number {i}"))).collect();
        summarizer.summarize(&posts).await.unwrap();

        let content = model.seen_user_content.lock().unwrap().clone().unwrap();
        assert!(content.starts_with("Tweets:\n- post number 0"));
        assert_eq!(content.lines().filter(|l| l.starts_with("- ")).count(), 50);
    }
}

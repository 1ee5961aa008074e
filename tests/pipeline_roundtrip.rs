//! Integration tests for the full pipeline: collect, score, draft,
//! review, evaluate, report.
//!
//! Each test runs against an in-memory store with either the offline
//! strategies or a scripted model, so the whole flow is deterministic.

use std::sync::Arc;

use async_trait::async_trait;

use xreply::collector::XClient;
use xreply::config::Settings;
use xreply::error::ModelError;
use xreply::llm::{CompletionModel, CompletionRequest, CompletionResponse, ModelBackend};
use xreply::personas::{PersonaCatalog, PersonaKey};
use xreply::pipeline::{PipelineRunner, ReplyDrafter, ReplyEvaluator};
use xreply::queue::ApprovalQueue;
use xreply::reports::{ReportGenerator, Summarizer};
use xreply::store::{LibSqlStore, Post, PostSource, PostStatus, RecordStore, ReplyStatus};

/// Scripted model for the configured path: answers drafting, scoring,
/// and summary requests with fixed payloads (no real API calls).
struct ScriptedModel;

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ModelError> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let content = if system.starts_with("Evaluate tweet reply quality") {
            "{\"relevance\": 0.8, \"tone_accuracy\": 0.75, \"value_added\": 0.7, \
             \"engagement_potential\": 0.72, \"predicted_likes\": 20, \
             \"predicted_retweets\": 5, \"predicted_replies\": 3}"
                .to_string()
        } else if system.contains("executive_summary") {
            "{\"executive_summary\": \"Quiet week.\", \"sentiment\": \"neutral\", \
             \"trends\": [\"rollups\"], \"risks\": [\"leverage\"]}"
                .to_string()
        } else {
            "Solid setup. Watching funding and open interest before leaning in.".to_string()
        };
        Ok(CompletionResponse { content })
    }
}

async fn memory_store() -> Arc<dyn RecordStore> {
    Arc::new(LibSqlStore::new_memory().await.unwrap())
}

fn sim_settings() -> Settings {
    Settings {
        openai_api_key: None,
        model: "gpt-4o-mini".into(),
        x_bearer_token: None,
        x_api_base: "https://api.x.com/2".into(),
        db_path: ":memory:".into(),
        report_dir: "./reports".into(),
        simulation: true,
        keywords: vec!["btc".into(), "ethereum".into(), "solana".into()],
        hashtags: vec!["#defi".into()],
    }
}

fn make_drafter(store: Arc<dyn RecordStore>, backend: ModelBackend) -> ReplyDrafter {
    ReplyDrafter::new(store, PersonaCatalog::standard(), backend)
}

fn make_runner(
    store: Arc<dyn RecordStore>,
    settings: &Settings,
    backend: ModelBackend,
) -> PipelineRunner {
    let drafter = make_drafter(Arc::clone(&store), backend.clone());
    let evaluator = ReplyEvaluator::new(Arc::clone(&store), backend);
    PipelineRunner::new(store, settings, drafter, evaluator)
}

fn fixture_post(external_id: &str, text: &str) -> Post {
    Post::new(external_id, text, "fixture_author", PostSource::Manual)
}

#[tokio::test]
async fn simulated_collection_scores_every_post() {
    let settings = sim_settings();
    let store = memory_store().await;
    let client = XClient::from_settings(&settings);
    let runner = make_runner(Arc::clone(&store), &settings, ModelBackend::Offline);

    let posts = client.collect_from_list(None, 6).await.unwrap();
    assert_eq!(posts.len(), 6);
    for post in &posts {
        assert_eq!(post.source, PostSource::Simulation);
        assert!(post.author_handle.starts_with("sim_user_"));
        assert!(!post.text.is_empty());
    }

    let outcome = runner.ingest(posts.clone()).await;
    assert_eq!(outcome.processed, 6);
    assert_eq!(outcome.failed, 0);

    let kept = store.posts_with_status(PostStatus::FilteredIn).await.unwrap();
    let dropped = store.posts_with_status(PostStatus::FilteredOut).await.unwrap();
    assert_eq!(kept.len() + dropped.len(), 6);
    assert!(
        store
            .posts_with_status(PostStatus::Collected)
            .await
            .unwrap()
            .is_empty()
    );

    // A second pass over the same batch is all duplicates.
    let again = runner.ingest(posts).await;
    assert_eq!(again.processed, 0);
    assert_eq!(again.skipped, 6);
}

#[tokio::test]
async fn offline_review_roundtrip() {
    let settings = sim_settings();
    let store = memory_store().await;
    let backend = ModelBackend::Offline;
    let runner = make_runner(Arc::clone(&store), &settings, backend.clone());
    let review = ApprovalQueue::new(
        Arc::clone(&store),
        make_drafter(Arc::clone(&store), backend.clone()),
    );

    let posts = vec![
        fixture_post("701", "BTC basis trade compresses while funding resets"),
        fixture_post("702", "Ethereum rollup fees dropped hard this week"),
        fixture_post("703", "Solana order flow keeps rotating between venues"),
    ];
    let ingested = runner.ingest(posts).await;
    assert_eq!(ingested.processed, 3);

    let drafted = runner.generate_pending(None).await.unwrap();
    assert_eq!(drafted.processed, 3);

    let pending = review.pending().await.unwrap();
    assert_eq!(pending.len(), 3);

    // Review pass: approve one, edit one, regenerate one.
    review.approve(pending[0].id).await.unwrap();
    let edited = review
        .edit(pending[1].id, "Tighter wording, same take.")
        .await
        .unwrap();
    assert_eq!(edited.status, ReplyStatus::Edited);
    let replacement = review
        .regenerate(pending[2].id, Some("neutral_researcher"))
        .await
        .unwrap();
    assert_eq!(replacement.persona, PersonaKey::NeutralResearcher);

    let retired = store.get_reply(pending[2].id).await.unwrap().unwrap();
    assert_eq!(retired.status, ReplyStatus::Rejected);
    assert_eq!(review.pending().await.unwrap().len(), 2);

    // Evaluation covers the queued replies and empties the queue.
    let scored = runner.evaluate_pending().await.unwrap();
    assert_eq!(scored.processed, 2);
    assert!(review.pending().await.unwrap().is_empty());

    let rescore = runner.evaluate_pending().await.unwrap();
    assert_eq!(rescore.processed, 0);

    assert!(store.find_evaluation(pending[0].id).await.unwrap().is_none());
    assert!(store.find_evaluation(edited.id).await.unwrap().is_some());
    assert!(store.find_evaluation(replacement.id).await.unwrap().is_some());

    // Weekly report covers all three posts.
    let dir = tempfile::tempdir().unwrap();
    let reporter = ReportGenerator::new(Arc::clone(&store), Summarizer::new(backend), dir.path());
    let report = reporter
        .weekly_report()
        .await
        .unwrap()
        .expect("report for a populated period");

    let markdown = std::fs::read_to_string(&report.summary_path).unwrap();
    assert!(markdown.contains("Analyzed 3 tweets focused on crypto market narratives."));
    let csv = std::fs::read_to_string(&report.csv_path).unwrap();
    assert_eq!(csv.lines().count(), 4);
}

#[tokio::test]
async fn scripted_model_drives_drafting_scoring_and_summary() {
    let settings = sim_settings();
    let store = memory_store().await;
    let backend = ModelBackend::configured(Arc::new(ScriptedModel));
    let runner = make_runner(Arc::clone(&store), &settings, backend.clone());

    runner
        .ingest(vec![fixture_post(
            "801",
            "BTC volatility compresses before the expiry",
        )])
        .await;
    let drafted = runner.generate_pending(None).await.unwrap();
    assert_eq!(drafted.processed, 1);

    let review = ApprovalQueue::new(
        Arc::clone(&store),
        make_drafter(Arc::clone(&store), backend.clone()),
    );
    let pending = review.pending().await.unwrap();
    assert_eq!(
        pending[0].text,
        "Solid setup. Watching funding and open interest before leaning in."
    );

    let scored = runner.evaluate_pending().await.unwrap();
    assert_eq!(scored.processed, 1);
    let evaluation = store.find_evaluation(pending[0].id).await.unwrap().unwrap();
    assert_eq!(evaluation.relevance, 0.8);
    assert_eq!(evaluation.predicted_likes, 20);

    let dir = tempfile::tempdir().unwrap();
    let reporter = ReportGenerator::new(Arc::clone(&store), Summarizer::new(backend), dir.path());
    let report = reporter.weekly_report().await.unwrap().unwrap();
    assert_eq!(report.insights["sentiment"], "neutral");
    assert_eq!(report.insights["executive_summary"], "Quiet week.");
}

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use xreply::cli::{Cli, Commands};
use xreply::collector::XClient;
use xreply::config::Settings;
use xreply::llm::ModelBackend;
use xreply::personas::PersonaCatalog;
use xreply::pipeline::{PipelineRunner, ReplyDrafter, ReplyEvaluator};
use xreply::queue::{ApprovalQueue, QueueAction};
use xreply::reports::{ReportGenerator, Summarizer};
use xreply::store::{LibSqlStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    // ── Store ────────────────────────────────────────────────────────────
    let store: Arc<dyn RecordStore> = Arc::new(
        LibSqlStore::new_local(Path::new(&settings.db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: failed to open database at {}: {}", settings.db_path, e);
                std::process::exit(1);
            }),
    );

    // ── Components ───────────────────────────────────────────────────────
    let backend = ModelBackend::from_settings(&settings);
    let client = XClient::from_settings(&settings);
    let catalog = PersonaCatalog::standard();

    let drafter = ReplyDrafter::new(Arc::clone(&store), catalog.clone(), backend.clone());
    let evaluator = ReplyEvaluator::new(Arc::clone(&store), backend.clone());
    let runner = PipelineRunner::new(Arc::clone(&store), &settings, drafter, evaluator);
    let review = ApprovalQueue::new(
        Arc::clone(&store),
        ReplyDrafter::new(Arc::clone(&store), catalog, backend.clone()),
    );
    let reporter = ReportGenerator::new(
        Arc::clone(&store),
        Summarizer::new(backend),
        &settings.report_dir,
    );

    match cli.command {
        Commands::Collect { list_id, count } => {
            let posts = client.collect_from_list(list_id.as_deref(), count).await?;
            let outcome = runner.ingest(posts).await;
            println!(
                "Collected {} posts ({} duplicates skipped).",
                outcome.processed, outcome.skipped
            );
        }

        Commands::Import { url_or_id } => {
            let post = client.import_by_url_or_id(&url_or_id).await?;
            let external_id = post.external_id.clone();
            let outcome = runner.ingest(vec![post]).await;
            if outcome.skipped > 0 {
                println!("Post {external_id} already exists.");
            } else {
                println!("Imported post {external_id}.");
            }
        }

        Commands::Generate { persona } => {
            let outcome = runner.generate_pending(persona.as_deref()).await?;
            println!(
                "Generated {} replies ({} posts already covered).",
                outcome.processed, outcome.skipped
            );
        }

        Commands::Queue {
            action,
            reply_id,
            text,
            persona,
        } => match QueueAction::from_parts(&action, reply_id, text, persona)? {
            QueueAction::Show => print_queue(&review).await?,
            QueueAction::Approve { reply_id } => {
                review.approve(reply_id).await?;
                println!("Reply {reply_id} approved.");
            }
            QueueAction::Reject { reply_id } => {
                review.reject(reply_id).await?;
                println!("Reply {reply_id} rejected.");
            }
            QueueAction::Edit { reply_id, text } => {
                review.edit(reply_id, &text).await?;
                println!("Reply {reply_id} edited.");
            }
            QueueAction::Regenerate { reply_id, persona } => {
                let fresh = review.regenerate(reply_id, persona.as_deref()).await?;
                println!("Drafted replacement {} as {}.", fresh.id, fresh.persona);
            }
        },

        Commands::Evaluate => {
            let outcome = runner.evaluate_pending().await?;
            println!(
                "Evaluated {} replies ({} already scored).",
                outcome.processed, outcome.skipped
            );
        }

        Commands::Report => print_report(&reporter).await?,

        Commands::Demo => {
            let posts = client.collect_from_list(None, 8).await?;
            let ingest = runner.ingest(posts).await;
            println!("Collected {} posts.", ingest.processed);

            let drafted = runner.generate_pending(None).await?;
            println!("Generated {} replies.", drafted.processed);

            let scored = runner.evaluate_pending().await?;
            println!("Evaluated {} replies.", scored.processed);

            print_report(&reporter).await?;
            print_queue(&review).await?;
        }
    }

    Ok(())
}

async fn print_queue(review: &ApprovalQueue) -> xreply::Result<()> {
    let pending = review.pending().await?;
    if pending.is_empty() {
        println!("Approval queue is empty.");
        return Ok(());
    }
    println!("Approval queue ({} waiting):", pending.len());
    for reply in pending {
        println!("  {}  [{}] {}: {}", reply.id, reply.status, reply.persona, reply.text);
    }
    Ok(())
}

async fn print_report(reporter: &ReportGenerator) -> xreply::Result<()> {
    match reporter.weekly_report().await? {
        Some(report) => {
            println!("Report written:");
            println!("  Markdown: {}", report.summary_path);
            println!("  CSV:      {}", report.csv_path);
        }
        None => println!("No data available for report."),
    }
    Ok(())
}

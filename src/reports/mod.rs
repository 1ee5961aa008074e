//! Weekly reporting: a Markdown narrative plus a per-post CSV export.

pub mod summarizer;

pub use summarizer::{Summarizer, Summary};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{ReportError, Result};
use crate::store::{Post, RecordStore, Report};

/// Trailing window covered by a weekly report.
const REPORT_WINDOW_DAYS: i64 = 7;

const CSV_HEADER: &str =
    "tweet_id,author_handle,text,like_count,retweet_count,reply_count,relevance_score,status";

/// Builds report artifacts on disk and records them in the store.
pub struct ReportGenerator {
    store: Arc<dyn RecordStore>,
    summarizer: Summarizer,
    report_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        summarizer: Summarizer,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            summarizer,
            report_dir: report_dir.into(),
        }
    }

    /// Report over the trailing seven days. Returns `Ok(None)` when the
    /// period holds no posts; otherwise writes both artifacts, records a
    /// `Report` row, and returns it.
    pub async fn weekly_report(&self) -> Result<Option<Report>> {
        let period_end = Utc::now();
        let period_start = period_end - Duration::days(REPORT_WINDOW_DAYS);

        let posts = self.store.posts_since(period_start).await?;
        if posts.is_empty() {
            return Ok(None);
        }

        let summary = self.summarizer.summarize(&posts).await?;

        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|e| ReportError::WriteFailed {
                path: self.report_dir.to_string_lossy().into_owned(),
                reason: e.to_string(),
            })?;

        let stamp = period_end.format("%Y%m%d_%H%M%S");
        let md_path = self.report_dir.join(format!("weekly_report_{stamp}.md"));
        let csv_path = self.report_dir.join(format!("weekly_report_{stamp}.csv"));

        write_artifact(
            &md_path,
            &render_markdown(&summary, &posts, period_start, period_end),
        )
        .await?;
        write_artifact(&csv_path, &render_csv(&posts)).await?;

        let report = Report::new(
            "weekly",
            md_path.to_string_lossy(),
            csv_path.to_string_lossy(),
            serde_json::to_value(&summary).unwrap_or_default(),
            period_start,
            period_end,
        );
        self.store.insert_report(&report).await?;

        info!(
            posts = posts.len(),
            summary_path = %md_path.display(),
            csv_path = %csv_path.display(),
            "Weekly report written"
        );
        Ok(Some(report))
    }
}

async fn write_artifact(path: &Path, contents: &str) -> std::result::Result<(), ReportError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| ReportError::WriteFailed {
            path: path.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })
}

fn render_markdown(
    summary: &Summary,
    posts: &[Post],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out.push_str("# Weekly X Reply Report\n\n");
    out.push_str(&format!(
        "Period: {} to {}\n\n",
        period_start.format("%Y-%m-%d"),
        period_end.format("%Y-%m-%d")
    ));
    out.push_str(&format!(
        "## Executive Summary\n\n{}\n\nOverall sentiment: **{}**\n\n",
        summary.executive_summary, summary.sentiment
    ));

    out.push_str("## Trends\n\n");
    if summary.trends.is_empty() {
        out.push_str("- none observed\n");
    } else {
        for trend in &summary.trends {
            out.push_str(&format!("- {trend}\n"));
        }
    }

    out.push_str("\n## Risks\n\n");
    if summary.risks.is_empty() {
        out.push_str("- none flagged\n");
    } else {
        for risk in &summary.risks {
            out.push_str(&format!("- {risk}\n"));
        }
    }

    out.push_str("\n## Posts\n\n");
    for post in posts {
        out.push_str(&format!(
            "- `{}` @{} ({}, relevance {:.2}): {}\n",
            post.external_id, post.author_handle, post.status, post.relevance_score, post.text
        ));
    }
    out
}

fn render_csv(posts: &[Post]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for post in posts {
        out.push_str(&format!(
            "{},{},{},{},{},{},{:.2},{}\n",
            csv_escape(&post.external_id),
            csv_escape(&post.author_handle),
            csv_escape(&post.text),
            post.like_count,
            post.retweet_count,
            post.reply_count,
            post.relevance_score,
            post.status,
        ));
    }
    out
}

/// RFC-4180-style quoting: fields holding commas, quotes, or line breaks
/// get wrapped in double quotes with inner quotes doubled.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

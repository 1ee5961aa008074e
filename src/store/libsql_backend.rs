//! libSQL backend: async `RecordStore` implementation.
//!
//! Supports local file and in-memory databases. Timestamps are written as
//! RFC 3339 text; reads also accept SQLite's `datetime()` output.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::model::{Evaluation, Post, PostSource, PostStatus, Reply, ReplyStatus, Report};
use crate::store::traits::RecordStore;

/// libSQL store.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Database opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Classify an insert failure: UNIQUE violations become `Constraint`.
fn map_insert_err(op: &str, e: libsql::Error) -> StoreError {
    let msg = e.to_string();
    if msg.contains("UNIQUE") {
        StoreError::Constraint(format!("{op}: {msg}"))
    } else {
        StoreError::Query(format!("{op}: {msg}"))
    }
}

/// Render a status list as a quoted SQL IN list. Status strings come from
/// the enum Display impls, never from user input.
fn status_in_list(statuses: &[ReplyStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

const POST_COLUMNS: &str = "id, external_id, text, author_handle, source, like_count, \
     retweet_count, reply_count, relevance_score, status, imported_at";

const REPLY_COLUMNS: &str = "id, post_id, persona, text, status, created_at";

const EVALUATION_COLUMNS: &str = "id, reply_id, relevance, tone_accuracy, value_add, \
     engagement_potential, predicted_likes, predicted_retweets, predicted_replies, raw, created_at";

/// Map a libsql Row to a Post. Column order matches POST_COLUMNS.
fn row_to_post(row: &libsql::Row) -> Result<Post, libsql::Error> {
    let id_str: String = row.get(0)?;
    let source_str: String = row.get(4)?;
    let status_str: String = row.get(9)?;
    let imported_str: String = row.get(10)?;

    Ok(Post {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        external_id: row.get(1)?,
        text: row.get(2)?,
        author_handle: row.get(3)?,
        source: source_str.parse().unwrap_or(PostSource::Simulation),
        like_count: row.get(5)?,
        retweet_count: row.get(6)?,
        reply_count: row.get(7)?,
        relevance_score: row.get(8)?,
        status: status_str.parse().unwrap_or(PostStatus::Collected),
        imported_at: parse_datetime(&imported_str),
    })
}

/// Map a libsql Row to a Reply. Column order matches REPLY_COLUMNS.
fn row_to_reply(row: &libsql::Row) -> Result<Reply, libsql::Error> {
    let id_str: String = row.get(0)?;
    let post_id_str: String = row.get(1)?;
    let persona_str: String = row.get(2)?;
    let status_str: String = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(Reply {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        post_id: Uuid::parse_str(&post_id_str).unwrap_or_else(|_| Uuid::nil()),
        persona: persona_str.parse().unwrap_or_default(),
        text: row.get(3)?,
        status: status_str.parse().unwrap_or(ReplyStatus::Generated),
        created_at: parse_datetime(&created_str),
    })
}

/// Map a libsql Row to an Evaluation. Column order matches EVALUATION_COLUMNS.
fn row_to_evaluation(row: &libsql::Row) -> Result<Evaluation, libsql::Error> {
    let id_str: String = row.get(0)?;
    let reply_id_str: String = row.get(1)?;
    let raw_str: String = row.get(9)?;
    let created_str: String = row.get(10)?;

    Ok(Evaluation {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        reply_id: Uuid::parse_str(&reply_id_str).unwrap_or_else(|_| Uuid::nil()),
        relevance: row.get(2)?,
        tone_accuracy: row.get(3)?,
        value_add: row.get(4)?,
        engagement_potential: row.get(5)?,
        predicted_likes: row.get(6)?,
        predicted_retweets: row.get(7)?,
        predicted_replies: row.get(8)?,
        raw: serde_json::from_str(&raw_str).unwrap_or(serde_json::Value::Null),
        created_at: parse_datetime(&created_str),
    })
}

#[async_trait]
impl RecordStore for LibSqlStore {
    // ── Posts ───────────────────────────────────────────────────────

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                post.id.to_string(),
                post.external_id.clone(),
                post.text.clone(),
                post.author_handle.clone(),
                post.source.to_string(),
                post.like_count,
                post.retweet_count,
                post.reply_count,
                post.relevance_score,
                post.status.to_string(),
                post.imported_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_post", e))?;

        debug!(post_id = %post.id, external_id = %post.external_id, "Post inserted");
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_post: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let post = row_to_post(&row)
                    .map_err(|e| StoreError::Query(format!("get_post row parse: {e}")))?;
                Ok(Some(post))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_post: {e}"))),
        }
    }

    async fn find_post_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Post>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE external_id = ?1"),
                params![external_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("find_post_by_external_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let post = row_to_post(&row).map_err(|e| {
                    StoreError::Query(format!("find_post_by_external_id row parse: {e}"))
                })?;
                Ok(Some(post))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("find_post_by_external_id: {e}"))),
        }
    }

    async fn update_post_status(&self, id: Uuid, status: PostStatus) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE posts SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id.to_string()],
        )
        .await
        .map_err(|e| StoreError::Query(format!("update_post_status: {e}")))?;

        debug!(post_id = %id, status = %status, "Post status updated");
        Ok(())
    }

    async fn posts_with_status(&self, status: PostStatus) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE status = ?1 ORDER BY imported_at DESC"
                ),
                params![status.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("posts_with_status: {e}")))?;

        let mut posts = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_post(&row) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::warn!("Skipping post row: {e}");
                }
            }
        }
        Ok(posts)
    }

    async fn posts_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE imported_at >= ?1 ORDER BY imported_at ASC"
                ),
                params![cutoff.to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("posts_since: {e}")))?;

        let mut posts = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_post(&row) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::warn!("Skipping post row: {e}");
                }
            }
        }
        Ok(posts)
    }

    // ── Replies ─────────────────────────────────────────────────────

    async fn insert_reply(&self, reply: &Reply) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            &format!("INSERT INTO replies ({REPLY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                reply.id.to_string(),
                reply.post_id.to_string(),
                reply.persona.to_string(),
                reply.text.clone(),
                reply.status.to_string(),
                reply.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_reply", e))?;

        debug!(reply_id = %reply.id, post_id = %reply.post_id, "Reply inserted");
        Ok(())
    }

    async fn get_reply(&self, id: Uuid) -> Result<Option<Reply>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_reply: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let reply = row_to_reply(&row)
                    .map_err(|e| StoreError::Query(format!("get_reply row parse: {e}")))?;
                Ok(Some(reply))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_reply: {e}"))),
        }
    }

    async fn replies_with_status(
        &self,
        statuses: &[ReplyStatus],
    ) -> Result<Vec<Reply>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {REPLY_COLUMNS} FROM replies WHERE status IN ({}) ORDER BY created_at ASC",
                    status_in_list(statuses)
                ),
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("replies_with_status: {e}")))?;

        let mut replies = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_reply(&row) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    tracing::warn!("Skipping reply row: {e}");
                }
            }
        }
        Ok(replies)
    }

    async fn replies_for_post(&self, post_id: Uuid) -> Result<Vec<Reply>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {REPLY_COLUMNS} FROM replies WHERE post_id = ?1 ORDER BY created_at ASC"
                ),
                params![post_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("replies_for_post: {e}")))?;

        let mut replies = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_reply(&row) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    tracing::warn!("Skipping reply row: {e}");
                }
            }
        }
        Ok(replies)
    }

    async fn update_reply_status(&self, id: Uuid, status: ReplyStatus) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE replies SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id.to_string()],
        )
        .await
        .map_err(|e| StoreError::Query(format!("update_reply_status: {e}")))?;

        debug!(reply_id = %id, status = %status, "Reply status updated");
        Ok(())
    }

    async fn update_reply_text(
        &self,
        id: Uuid,
        text: &str,
        status: ReplyStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE replies SET text = ?1, status = ?2 WHERE id = ?3",
            params![text, status.to_string(), id.to_string()],
        )
        .await
        .map_err(|e| StoreError::Query(format!("update_reply_text: {e}")))?;

        debug!(reply_id = %id, "Reply text updated");
        Ok(())
    }

    // ── Evaluations ─────────────────────────────────────────────────

    async fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let conn = self.conn();
        let raw_json = serde_json::to_string(&evaluation.raw)
            .map_err(|e| StoreError::Serialization(format!("insert_evaluation raw: {e}")))?;

        conn.execute(
            &format!(
                "INSERT INTO evaluations ({EVALUATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                evaluation.id.to_string(),
                evaluation.reply_id.to_string(),
                evaluation.relevance,
                evaluation.tone_accuracy,
                evaluation.value_add,
                evaluation.engagement_potential,
                evaluation.predicted_likes,
                evaluation.predicted_retweets,
                evaluation.predicted_replies,
                raw_json,
                evaluation.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_evaluation", e))?;

        debug!(evaluation_id = %evaluation.id, reply_id = %evaluation.reply_id, "Evaluation inserted");
        Ok(())
    }

    async fn find_evaluation(&self, reply_id: Uuid) -> Result<Option<Evaluation>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {EVALUATION_COLUMNS} FROM evaluations WHERE reply_id = ?1"),
                params![reply_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("find_evaluation: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let evaluation = row_to_evaluation(&row)
                    .map_err(|e| StoreError::Query(format!("find_evaluation row parse: {e}")))?;
                Ok(Some(evaluation))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("find_evaluation: {e}"))),
        }
    }

    // ── Reports ─────────────────────────────────────────────────────

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        let conn = self.conn();
        let insights_json = serde_json::to_string(&report.insights)
            .map_err(|e| StoreError::Serialization(format!("insert_report insights: {e}")))?;

        conn.execute(
            "INSERT INTO reports (id, report_type, summary_path, csv_path, insights, period_start, period_end, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.id.to_string(),
                report.report_type.clone(),
                report.summary_path.clone(),
                report.csv_path.clone(),
                insights_json,
                report.period_start.to_rfc3339(),
                report.period_end.to_rfc3339(),
                report.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_report", e))?;

        debug!(report_id = %report.id, report_type = %report.report_type, "Report inserted");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

//! Persistence layer: libSQL-backed storage for posts, replies,
//! evaluations, and reports.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use model::{Evaluation, Post, PostSource, PostStatus, Reply, ReplyStatus, Report};
pub use traits::RecordStore;

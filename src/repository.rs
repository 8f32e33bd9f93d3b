use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{FilterSpec, ManualLogEntry, RefKind, Reference, Video, WatchLogEntry};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Read-only catalogue access. The query engine is agnostic to the backing
/// store; filtering, sorting and pagination semantics live in `query` and are
/// shared by every implementation.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Videos matching the complete filter, sorted and paginated.
    /// `user_id` is only consulted when `spec.hide_watched` is set.
    async fn query(&self, spec: &FilterSpec, user_id: Option<i32>) -> RepoResult<Vec<Video>>;

    /// All reference entities of one kind, in table order.
    async fn reference_entities(&self, kind: RefKind) -> RepoResult<Vec<Reference>>;
}

#[async_trait]
pub trait WatchLogRepository: Send + Sync {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<WatchLogEntry>>;
    async fn insert(&self, entry: WatchLogEntry) -> RepoResult<()>;
}

#[async_trait]
pub trait ManualLogRepository: Send + Sync {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<ManualLogEntry>>;
    async fn insert(&self, entry: ManualLogEntry) -> RepoResult<()>;
    /// Deletes the caller's logs with the given start instant and duration,
    /// returning how many rows went away.
    async fn delete_matching(
        &self,
        user_id: i32,
        started_at: NaiveDateTime,
        duration_seconds: i32,
    ) -> RepoResult<u64>;
}

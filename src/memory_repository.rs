//! In-memory repository implementations. They back the integration tests and
//! share the exact filter/sort/pagination semantics with the Postgres
//! implementations through `query::execute`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{FilterSpec, ManualLogEntry, RefKind, Reference, Video, WatchLogEntry};
use crate::query;
use crate::repository::{
    CatalogRepository, ManualLogRepository, RepoResult, WatchLogRepository,
};

#[derive(Default)]
pub struct InMemoryWatchLogs {
    entries: RwLock<Vec<WatchLogEntry>>,
}

impl InMemoryWatchLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched_ids(&self, user_id: i32) -> HashSet<i32> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| e.video_id)
            .collect()
    }
}

#[async_trait]
impl WatchLogRepository for InMemoryWatchLogs {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<WatchLogEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, entry: WatchLogEntry) -> RepoResult<()> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryManualLogs {
    entries: RwLock<Vec<ManualLogEntry>>,
}

impl InMemoryManualLogs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManualLogRepository for InMemoryManualLogs {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<ManualLogEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, entry: ManualLogEntry) -> RepoResult<()> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }

    async fn delete_matching(
        &self,
        user_id: i32,
        started_at: NaiveDateTime,
        duration_seconds: i32,
    ) -> RepoResult<u64> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| {
            !(e.user_id == user_id
                && e.started_at == started_at
                && e.duration_seconds == duration_seconds)
        });
        Ok((before - entries.len()) as u64)
    }
}

pub struct InMemoryCatalog {
    videos: RwLock<Vec<Video>>,
    references: RwLock<HashMap<RefKind, Vec<Reference>>>,
    watch_logs: Option<Arc<InMemoryWatchLogs>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        InMemoryCatalog {
            videos: RwLock::new(Vec::new()),
            references: RwLock::new(HashMap::new()),
            watch_logs: None,
        }
    }

    /// Lets hide-watched consult the same store the watch-log repository
    /// writes to.
    pub fn with_watch_logs(watch_logs: Arc<InMemoryWatchLogs>) -> Self {
        InMemoryCatalog {
            videos: RwLock::new(Vec::new()),
            references: RwLock::new(HashMap::new()),
            watch_logs: Some(watch_logs),
        }
    }

    pub fn set_videos(&self, videos: Vec<Video>) {
        *self.videos.write().unwrap() = videos;
    }

    pub fn set_references(&self, kind: RefKind, entries: Vec<Reference>) {
        self.references.write().unwrap().insert(kind, entries);
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn query(&self, spec: &FilterSpec, user_id: Option<i32>) -> RepoResult<Vec<Video>> {
        let videos = self.videos.read().unwrap().clone();
        let watched = match (spec.hide_watched, user_id, &self.watch_logs) {
            (true, Some(uid), Some(logs)) => Some(logs.watched_ids(uid)),
            _ => None,
        };
        Ok(query::execute(videos, spec, watched.as_ref()))
    }

    async fn reference_entities(&self, kind: RefKind) -> RepoResult<Vec<Reference>> {
        Ok(self
            .references
            .read()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }
}

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Row};

use crate::models::{
    FilterSpec, Level, ManualLogEntry, RefKind, Reference, Video, WatchLogEntry,
};
use crate::query;
use crate::repository::{
    CatalogRepository, ManualLogRepository, RepoResult, WatchLogRepository,
};

const VIDEO_SELECT: &str = "SELECT v.id, v.title, v.description, v.channel_id, v.level, \
       v.premium, v.duration, v.upload_date, \
       coalesce(array_agg(DISTINCT vt.tag_id) FILTER (WHERE vt.tag_id IS NOT NULL), '{}') AS tag_ids, \
       coalesce(array_agg(DISTINCT vs.speaker_id) FILTER (WHERE vs.speaker_id IS NOT NULL), '{}') AS speaker_ids \
  FROM videos v \
  LEFT JOIN video_tags vt ON vt.video_id = v.id \
  LEFT JOIN video_speakers vs ON vs.video_id = v.id \
 WHERE 1 = 1";

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        PgCatalogRepository { pool }
    }

    async fn watched_ids(&self, user_id: i32) -> RepoResult<HashSet<i32>> {
        let rows = sqlx::query(
            "SELECT DISTINCT video_id FROM watch_logs WHERE user_id = $1 AND video_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get::<i32, _>("video_id")).collect())
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn query(&self, spec: &FilterSpec, user_id: Option<i32>) -> RepoResult<Vec<Video>> {
        // Scalar constraints are pushed into SQL so a statistics request does
        // not pull the whole table seven times. The shared engine re-checks
        // every predicate, so the pushdown only narrows the fetched set.
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(VIDEO_SELECT);
        if !spec.levels.is_empty() {
            let names: Vec<String> =
                spec.levels.iter().map(|l| l.as_str().to_string()).collect();
            builder.push(" AND v.level = ANY(").push_bind(names).push(")");
        }
        if !spec.channel_ids.is_empty() {
            builder
                .push(" AND v.channel_id = ANY(")
                .push_bind(spec.channel_ids.clone())
                .push(")");
        }
        if let Some(min) = spec.min_duration {
            builder.push(" AND v.duration >= ").push_bind(min);
        }
        if let Some(max) = spec.max_duration {
            builder.push(" AND v.duration <= ").push_bind(max);
        }
        builder.push(" GROUP BY v.id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let videos = rows
            .iter()
            .map(|row| Video {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                channel_id: row.get("channel_id"),
                level: Level::parse(&row.get::<String, _>("level")).unwrap_or(Level::Beginner),
                premium: row.get("premium"),
                duration: row.get("duration"),
                upload_date: row.get("upload_date"),
                tag_ids: row.get("tag_ids"),
                speaker_ids: row.get("speaker_ids"),
            })
            .collect();

        let watched = match (spec.hide_watched, user_id) {
            (true, Some(uid)) => Some(self.watched_ids(uid).await?),
            _ => None,
        };

        Ok(query::execute(videos, spec, watched.as_ref()))
    }

    async fn reference_entities(&self, kind: RefKind) -> RepoResult<Vec<Reference>> {
        let sql = match kind {
            RefKind::Channel => "SELECT id, name FROM channels ORDER BY id",
            RefKind::Tag => "SELECT id, name FROM tags ORDER BY id",
            RefKind::Speaker => "SELECT id, name FROM speakers ORDER BY id",
        };
        let refs = sqlx::query_as::<_, Reference>(sql).fetch_all(&self.pool).await?;
        Ok(refs)
    }
}

pub struct PgWatchLogRepository {
    pool: PgPool,
}

impl PgWatchLogRepository {
    pub fn new(pool: PgPool) -> Self {
        PgWatchLogRepository { pool }
    }
}

#[async_trait]
impl WatchLogRepository for PgWatchLogRepository {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<WatchLogEntry>> {
        let entries = sqlx::query_as::<_, WatchLogEntry>(
            "SELECT user_id, video_id, watched_at, watched_seconds, video_time_start, video_time_end \
               FROM watch_logs WHERE user_id = $1 ORDER BY watched_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn insert(&self, entry: WatchLogEntry) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO watch_logs (user_id, video_id, watched_at, watched_seconds, video_time_start, video_time_end) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.user_id)
        .bind(entry.video_id)
        .bind(entry.watched_at)
        .bind(entry.watched_seconds)
        .bind(entry.video_time_start)
        .bind(entry.video_time_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgManualLogRepository {
    pool: PgPool,
}

impl PgManualLogRepository {
    pub fn new(pool: PgPool) -> Self {
        PgManualLogRepository { pool }
    }
}

#[async_trait]
impl ManualLogRepository for PgManualLogRepository {
    async fn for_user(&self, user_id: i32) -> RepoResult<Vec<ManualLogEntry>> {
        let entries = sqlx::query_as::<_, ManualLogEntry>(
            "SELECT user_id, started_at, ended_at, duration_seconds, comment \
               FROM manual_logs WHERE user_id = $1 ORDER BY started_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn insert(&self, entry: ManualLogEntry) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO manual_logs (user_id, started_at, ended_at, duration_seconds, comment) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.user_id)
        .bind(entry.started_at)
        .bind(entry.ended_at)
        .bind(entry.duration_seconds)
        .bind(&entry.comment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_matching(
        &self,
        user_id: i32,
        started_at: NaiveDateTime,
        duration_seconds: i32,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            "DELETE FROM manual_logs WHERE user_id = $1 AND started_at = $2 AND duration_seconds = $3",
        )
        .bind(user_id)
        .bind(started_at)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

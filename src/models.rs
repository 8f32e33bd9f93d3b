use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Ordered proficiency tiers. Display/wire form is the capitalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Level> {
        match value {
            "Beginner" => Some(Level::Beginner),
            "Intermediate" => Some(Level::Intermediate),
            "Advanced" => Some(Level::Advanced),
            _ => None,
        }
    }
}

/// Which reference table an id/name pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Channel,
    Tag,
    Speaker,
}

/// Channel/Tag/Speaker row: an id and a unique name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reference {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub channel_id: i32,
    pub level: Level,
    pub premium: bool,
    /// Seconds, >= 0.
    pub duration: i32,
    /// Opaque sortable string, e.g. "20240117".
    pub upload_date: String,
    pub tag_ids: Vec<i32>,
    pub speaker_ids: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    New,
    Old,
    Short,
    Long,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::New
    }
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<SortOrder> {
        match value {
            "new" => Some(SortOrder::New),
            "old" => Some(SortOrder::Old),
            "short" => Some(SortOrder::Short),
            "long" => Some(SortOrder::Long),
            _ => None,
        }
    }
}

/// Fully-resolved browse filter. Immutable once parsed; facet and histogram
/// queries derive relaxed copies rather than mutating it.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub levels: Vec<Level>,
    pub channel_ids: Vec<i32>,
    pub tag_ids: Vec<i32>,
    pub speaker_ids: Vec<i32>,
    /// Seconds, already normalized through the minutes heuristic.
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub text: String,
    pub hide_watched: bool,
    pub sort: SortOrder,
    /// 0-based page; `None` runs the query unpaged (internal use only).
    pub page: Option<u32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WatchLogEntry {
    pub user_id: i32,
    /// Nullable: the video may be deleted after the log was written.
    pub video_id: Option<i32>,
    pub watched_at: NaiveDateTime,
    pub watched_seconds: i32,
    pub video_time_start: f64,
    pub video_time_end: f64,
}

/// Manual ("off-platform") study log. `duration_seconds` is reported study
/// time and is deliberately independent of `ended_at - started_at`.
#[derive(Debug, Clone, FromRow)]
pub struct ManualLogEntry {
    pub user_id: i32,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub duration_seconds: i32,
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: usize,
}

// ---- wire types ----

#[derive(Debug, Serialize)]
pub struct VideoSummary {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub channel_id: i32,
    #[serde(rename = "channelName")]
    pub channel_name: Option<String>,
    pub duration: i32,
    pub level: Level,
    pub premium: bool,
    pub upload_date: String,
    pub url: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize)]
pub struct BrowseResponse {
    pub videos: Vec<VideoSummary>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationBucket {
    pub count: usize,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Serialize)]
pub struct Statistics {
    pub levels: Vec<FacetCount>,
    pub channels: Vec<FacetCount>,
    pub speakers: Vec<FacetCount>,
    pub topics: Vec<FacetCount>,
    pub durations: Vec<DurationBucket>,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total: usize,
    pub statistics: Statistics,
}

/// Per-day activity totals. `off` stays fractional until serialization so a
/// multi-day manual log re-sums to its original duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayActivity {
    pub on: i64,
    pub off: f64,
}

#[derive(Debug, Deserialize)]
pub struct WatchtimeUpdateRequest {
    #[serde(rename = "videoId")]
    pub video_id: Option<i32>,
    #[serde(rename = "lastVideoTime")]
    pub last_video_time: Option<f64>,
    #[serde(rename = "elapsedTime")]
    pub elapsed_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OffPlatformTimeRequest {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub minutes: Option<f64>,
    pub comment: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OffPlatformDeleteRequest {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    pub minutes: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ManualLogView {
    pub minutes: f64,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    pub comment: String,
}

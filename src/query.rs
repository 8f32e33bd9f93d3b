use std::collections::{HashMap, HashSet};

use log::warn;

use crate::histogram;
use crate::models::{
    FacetCount, FilterSpec, RefKind, Reference, SortOrder, Statistics, StatisticsResponse, Video,
};
use crate::reference_cache::ReferenceCache;
use crate::repository::{CatalogRepository, RepoResult};

pub const PAGE_SIZE: usize = 50;

/// A filter dimension with a finite value set and a displayed per-value count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetGroup {
    Level,
    Channel,
    Speaker,
    Topic,
}

impl FacetGroup {
    /// The spec with this group's own constraint removed and paging disabled.
    /// Every other constraint (duration, text, hide-watched included) stays.
    pub fn relaxed(&self, spec: &FilterSpec) -> FilterSpec {
        let mut relaxed = spec.clone();
        relaxed.page = None;
        match self {
            FacetGroup::Level => relaxed.levels.clear(),
            FacetGroup::Channel => relaxed.channel_ids.clear(),
            FacetGroup::Speaker => relaxed.speaker_ids.clear(),
            FacetGroup::Topic => relaxed.tag_ids.clear(),
        }
        relaxed
    }
}

/// The histogram's input relaxes duration *and* level, nothing else.
pub fn duration_dataset_spec(spec: &FilterSpec) -> FilterSpec {
    let mut relaxed = spec.clone();
    relaxed.page = None;
    relaxed.min_duration = None;
    relaxed.max_duration = None;
    relaxed.levels.clear();
    relaxed
}

/// Conjunction across filter groups, disjunction within a group. An empty
/// group applies no constraint.
pub fn matches(video: &Video, spec: &FilterSpec, watched: Option<&HashSet<i32>>) -> bool {
    if !spec.levels.is_empty() && !spec.levels.contains(&video.level) {
        return false;
    }
    if !spec.channel_ids.is_empty() && !spec.channel_ids.contains(&video.channel_id) {
        return false;
    }
    if !spec.tag_ids.is_empty() && !video.tag_ids.iter().any(|t| spec.tag_ids.contains(t)) {
        return false;
    }
    if !spec.speaker_ids.is_empty()
        && !video.speaker_ids.iter().any(|s| spec.speaker_ids.contains(s))
    {
        return false;
    }
    if let Some(min) = spec.min_duration {
        if (video.duration as f64) < min {
            return false;
        }
    }
    if let Some(max) = spec.max_duration {
        if (video.duration as f64) > max {
            return false;
        }
    }
    if !spec.text.is_empty() {
        let needle = spec.text.to_lowercase();
        if !video.title.to_lowercase().contains(&needle)
            && !video.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if spec.hide_watched {
        if let Some(watched) = watched {
            if watched.contains(&video.id) {
                return false;
            }
        }
    }
    true
}

/// Total order: date/duration key first, id as tie-break, so pagination is
/// deterministic and complete.
pub fn sort_videos(videos: &mut [Video], sort: SortOrder) {
    match sort {
        SortOrder::New => videos.sort_by(|a, b| {
            b.upload_date.cmp(&a.upload_date).then(b.id.cmp(&a.id))
        }),
        SortOrder::Old => videos.sort_by(|a, b| {
            a.upload_date.cmp(&b.upload_date).then(a.id.cmp(&b.id))
        }),
        SortOrder::Short => videos.sort_by(|a, b| {
            a.duration.cmp(&b.duration).then(a.id.cmp(&b.id))
        }),
        SortOrder::Long => videos.sort_by(|a, b| {
            b.duration.cmp(&a.duration).then(b.id.cmp(&a.id))
        }),
    }
}

pub fn paginate(videos: Vec<Video>, page: Option<u32>) -> Vec<Video> {
    match page {
        None => videos,
        Some(page) => videos
            .into_iter()
            .skip(page as usize * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect(),
    }
}

/// Filter + sort + paginate. Shared by every `CatalogRepository`
/// implementation so the engine's semantics do not depend on the store.
pub fn execute(
    videos: Vec<Video>,
    spec: &FilterSpec,
    watched: Option<&HashSet<i32>>,
) -> Vec<Video> {
    let mut matched: Vec<Video> = videos
        .into_iter()
        .filter(|v| matches(v, spec, watched))
        .collect();
    sort_videos(&mut matched, spec.sort);
    paginate(matched, spec.page)
}

pub fn level_counts(videos: &[Video]) -> Vec<FacetCount> {
    let mut counts: HashMap<crate::models::Level, usize> = HashMap::new();
    for v in videos {
        *counts.entry(v.level).or_default() += 1;
    }
    crate::models::Level::ALL
        .iter()
        .map(|level| FacetCount {
            name: level.as_str().to_string(),
            count: counts.get(level).copied().unwrap_or(0),
        })
        .collect()
}

pub fn channel_counts(videos: &[Video], refs: &[Reference]) -> Vec<FacetCount> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for v in videos {
        *counts.entry(v.channel_id).or_default() += 1;
    }
    zero_filled(refs, &counts)
}

/// A video with two speakers feeds two buckets.
pub fn speaker_counts(videos: &[Video], refs: &[Reference]) -> Vec<FacetCount> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for v in videos {
        for s in &v.speaker_ids {
            *counts.entry(*s).or_default() += 1;
        }
    }
    zero_filled(refs, &counts)
}

/// Tag occurrences, name-sorted for a stable UI.
pub fn topic_counts(videos: &[Video], refs: &[Reference]) -> Vec<FacetCount> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for v in videos {
        for t in &v.tag_ids {
            *counts.entry(*t).or_default() += 1;
        }
    }
    let mut topics = zero_filled(refs, &counts);
    topics.sort_by(|a, b| a.name.cmp(&b.name));
    topics
}

fn zero_filled(refs: &[Reference], counts: &HashMap<i32, usize>) -> Vec<FacetCount> {
    refs.iter()
        .map(|r| FacetCount {
            name: r.name.clone(),
            count: counts.get(&r.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Runs the primary unpaged query plus the five relaxed queries (four facets
/// and the histogram dataset) concurrently. A failed facet sub-query degrades
/// to all-zero counts for that facet; only a failure of the primary query
/// fails the whole request.
pub async fn collect_statistics(
    catalog: &dyn CatalogRepository,
    cache: &ReferenceCache,
    spec: &FilterSpec,
    user_id: Option<i32>,
) -> RepoResult<StatisticsResponse> {
    let mut base = spec.clone();
    base.page = None;

    let channel_refs = cache.entries(catalog, RefKind::Channel).await?;
    let speaker_refs = cache.entries(catalog, RefKind::Speaker).await?;
    let tag_refs = cache.entries(catalog, RefKind::Tag).await?;

    let no_level = FacetGroup::Level.relaxed(&base);
    let no_channel = FacetGroup::Channel.relaxed(&base);
    let no_speaker = FacetGroup::Speaker.relaxed(&base);
    let no_topic = FacetGroup::Topic.relaxed(&base);
    let duration_spec = duration_dataset_spec(&base);

    let (all, vs_no_level, vs_no_channel, vs_no_speaker, vs_no_topic, vs_durations) = futures::join!(
        catalog.query(&base, user_id),
        catalog.query(&no_level, user_id),
        catalog.query(&no_channel, user_id),
        catalog.query(&no_speaker, user_id),
        catalog.query(&no_topic, user_id),
        catalog.query(&duration_spec, user_id),
    );

    let all = all?;

    let durations: Vec<i32> = facet_dataset(vs_durations, "durations")
        .iter()
        .map(|v| v.duration)
        .collect();

    Ok(StatisticsResponse {
        total: all.len(),
        statistics: Statistics {
            levels: level_counts(&facet_dataset(vs_no_level, "levels")),
            channels: channel_counts(&facet_dataset(vs_no_channel, "channels"), &channel_refs),
            speakers: speaker_counts(&facet_dataset(vs_no_speaker, "speakers"), &speaker_refs),
            topics: topic_counts(&facet_dataset(vs_no_topic, "topics"), &tag_refs),
            durations: histogram::build(&durations),
        },
    })
}

fn facet_dataset(result: RepoResult<Vec<Video>>, facet: &str) -> Vec<Video> {
    match result {
        Ok(videos) => videos,
        Err(e) => {
            warn!("facet sub-query '{}' failed, degrading to zero counts: {:?}", facet, e);
            Vec::new()
        }
    }
}

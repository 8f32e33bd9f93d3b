use crate::models::{FilterSpec, Level, RefKind, SortOrder};
use crate::reference_cache::ReferenceCache;
use crate::repository::{CatalogRepository, RepoResult};

/// Bounds below this are minutes and get multiplied by 60; anything at or
/// above is taken as already being seconds. Deliberately preserved heuristic;
/// regression tests pin it.
pub const MINUTES_THRESHOLD: f64 = 1000.0;

fn get<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn getlist<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn split_commas(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn dedupe_preserve_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for value in values {
        if value.is_empty() || !seen.insert(value.clone()) {
            continue;
        }
        ordered.push(value);
    }
    ordered
}

/// Collects one logical field from its three accepted spellings: repeated
/// singular keys, a comma-joined plural key, and the bracket-suffixed
/// singular variant some clients send.
fn merge_query_values(
    params: &[(String, String)],
    plural_key: &str,
    singular_key: &str,
) -> Vec<String> {
    let mut values: Vec<String> = getlist(params, singular_key)
        .into_iter()
        .map(String::from)
        .collect();

    if let Some(plural_value) = get(params, plural_key) {
        values.extend(split_commas(plural_value));
    }

    let bracket_key = format!("{}[]", singular_key);
    values.extend(getlist(params, &bracket_key).into_iter().map(String::from));

    dedupe_preserve_order(values)
}

/// Integer values pass through as ids; names resolve through the cache;
/// anything unresolvable is dropped. A fully-unresolved group ends up empty,
/// i.e. unconstrained.
async fn resolve_reference_values(
    values: Vec<String>,
    catalog: &dyn CatalogRepository,
    cache: &ReferenceCache,
    kind: RefKind,
) -> RepoResult<Vec<i32>> {
    let mut ids = Vec::new();
    for value in values {
        let id = match value.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => cache.name_to_id(catalog, kind, &value).await?,
        };
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

pub fn normalize_duration_bound(value: f64) -> f64 {
    if value < MINUTES_THRESHOLD {
        value * 60.0
    } else {
        value
    }
}

/// `"min,max"` with either side optionally empty. Any malformation (wrong
/// arity, unparseable number) clears both bounds rather than erroring.
fn parse_duration_pair(raw: &str) -> (Option<f64>, Option<f64>) {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return (None, None);
    }
    let parse_side = |side: &str| -> Result<Option<f64>, ()> {
        if side.is_empty() {
            Ok(None)
        } else {
            side.parse::<f64>().map(Some).map_err(|_| ())
        }
    };
    match (parse_side(parts[0]), parse_side(parts[1])) {
        (Ok(min), Ok(max)) => (min, max),
        _ => (None, None),
    }
}

/// 0-based page; parse failures and negatives clamp to 0.
pub fn parse_page(params: &[(String, String)]) -> u32 {
    get(params, "page")
        .and_then(|v| v.parse::<i64>().ok())
        .map(|p| p.max(0) as u32)
        .unwrap_or(0)
}

/// Turns the raw query-pair list into a fully-resolved `FilterSpec`.
/// `page` is left unset; the browse handler decides paging.
pub async fn parse_filters(
    params: &[(String, String)],
    catalog: &dyn CatalogRepository,
    cache: &ReferenceCache,
) -> RepoResult<FilterSpec> {
    let levels: Vec<Level> = merge_query_values(params, "levels", "level")
        .iter()
        .filter_map(|v| Level::parse(v))
        .collect();

    let channel_values = merge_query_values(params, "channels", "channel");
    let channel_ids =
        resolve_reference_values(channel_values, catalog, cache, RefKind::Channel).await?;

    let topic_values = merge_query_values(params, "topics", "topic");
    let tag_ids = resolve_reference_values(topic_values, catalog, cache, RefKind::Tag).await?;

    let mut speaker_values = merge_query_values(params, "speakers", "speaker");
    if speaker_values.is_empty() {
        // Legacy clients still send speakers__name.
        speaker_values = merge_query_values(params, "speakers__name", "speakers__name");
    }
    let speaker_ids =
        resolve_reference_values(speaker_values, catalog, cache, RefKind::Speaker).await?;

    let (mut min_duration, mut max_duration) = match get(params, "durations") {
        Some(raw) if !raw.is_empty() => parse_duration_pair(raw),
        _ => (None, None),
    };
    if let Some(raw) = get(params, "min_duration") {
        if let Ok(v) = raw.parse::<f64>() {
            min_duration = Some(v);
        }
    }
    if let Some(raw) = get(params, "max_duration") {
        if let Ok(v) = raw.parse::<f64>() {
            max_duration = Some(v);
        }
    }
    let min_duration = min_duration.map(normalize_duration_bound);
    let max_duration = max_duration.map(normalize_duration_bound);

    let mut hide_watched = false;
    for key in ["hide-watched", "hide_watched", "hideWatched"] {
        if let Some(value) = get(params, key) {
            if matches!(value.to_lowercase().as_str(), "1" | "true" | "yes") {
                hide_watched = true;
                break;
            }
        }
    }

    let sort_raw = get(params, "sort").unwrap_or("new").to_lowercase();
    let sort_raw = match sort_raw.as_str() {
        "recent" | "popular" => "new",
        "duration" | "duration_desc" => "long",
        "duration_asc" => "short",
        other => other,
    };
    let sort = SortOrder::parse(sort_raw).unwrap_or(SortOrder::New);

    let text = get(params, "text")
        .filter(|v| !v.is_empty())
        .or_else(|| get(params, "search").filter(|v| !v.is_empty()))
        .unwrap_or("")
        .to_string();

    Ok(FilterSpec {
        levels,
        channel_ids,
        tag_ids,
        speaker_ids,
        min_duration,
        max_duration,
        text,
        hide_watched,
        sort,
        page: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_repository::InMemoryCatalog;
    use crate::models::Reference;

    fn qp(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn seeded() -> (InMemoryCatalog, ReferenceCache) {
        let catalog = InMemoryCatalog::new();
        catalog.set_references(
            RefKind::Channel,
            vec![
                Reference { id: 1, name: "Easy Russian".into() },
                Reference { id: 2, name: "Real Talk".into() },
            ],
        );
        catalog.set_references(
            RefKind::Tag,
            vec![
                Reference { id: 10, name: "grammar".into() },
                Reference { id: 11, name: "culture".into() },
            ],
        );
        catalog.set_references(
            RefKind::Speaker,
            vec![Reference { id: 20, name: "Anna".into() }],
        );
        (catalog, ReferenceCache::new())
    }

    #[tokio::test]
    async fn three_level_spellings_parse_identically() {
        let (catalog, cache) = seeded();
        let repeated = parse_filters(
            &qp(&[("level", "Beginner"), ("level", "Advanced")]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();
        let plural = parse_filters(&qp(&[("levels", "Beginner,Advanced")]), &catalog, &cache)
            .await
            .unwrap();
        let bracket = parse_filters(
            &qp(&[("level[]", "Beginner"), ("level[]", "Advanced")]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();

        let expected = vec![Level::Beginner, Level::Advanced];
        assert_eq!(repeated.levels, expected);
        assert_eq!(plural.levels, expected);
        assert_eq!(bracket.levels, expected);
    }

    #[tokio::test]
    async fn merged_values_dedupe_preserving_first_seen_order() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(
            &qp(&[
                ("level", "Advanced"),
                ("levels", "Beginner, Advanced"),
                ("level[]", "Beginner"),
            ]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(spec.levels, vec![Level::Advanced, Level::Beginner]);
    }

    #[tokio::test]
    async fn names_resolve_and_unknown_names_drop() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(
            &qp(&[("channels", "Real Talk,No Such Channel"), ("topics", "grammar")]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(spec.channel_ids, vec![2]);
        assert_eq!(spec.tag_ids, vec![10]);
    }

    #[tokio::test]
    async fn integer_reference_values_pass_through() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("channels", "7,Easy Russian")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.channel_ids, vec![7, 1]);
    }

    #[tokio::test]
    async fn legacy_speakers_name_key_is_a_fallback() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("speakers__name", "Anna")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.speaker_ids, vec![20]);

        // The modern key wins when present.
        let spec = parse_filters(
            &qp(&[("speaker", "Anna"), ("speakers__name", "Nobody")]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(spec.speaker_ids, vec![20]);
    }

    #[tokio::test]
    async fn duration_pair_under_threshold_is_minutes() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("durations", "5,10")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.min_duration, Some(300.0));
        assert_eq!(spec.max_duration, Some(600.0));
    }

    #[tokio::test]
    async fn duration_threshold_boundary_is_pinned() {
        // 999 is still minutes; 1000 is already seconds. Possibly wrong for
        // long videos, but pinned behavior.
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("durations", "999,1000")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.min_duration, Some(999.0 * 60.0));
        assert_eq!(spec.max_duration, Some(1000.0));
    }

    #[tokio::test]
    async fn malformed_durations_clear_both_bounds() {
        let (catalog, cache) = seeded();
        for raw in ["abc,5", "5", "1,2,3", "5,xyz"] {
            let spec = parse_filters(&qp(&[("durations", raw)]), &catalog, &cache)
                .await
                .unwrap();
            assert_eq!(spec.min_duration, None, "raw={}", raw);
            assert_eq!(spec.max_duration, None, "raw={}", raw);
        }
    }

    #[tokio::test]
    async fn half_open_duration_pair_keeps_the_present_side() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("durations", ",30")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.min_duration, None);
        assert_eq!(spec.max_duration, Some(1800.0));
    }

    #[tokio::test]
    async fn explicit_bounds_override_the_pair() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(
            &qp(&[("durations", "5,10"), ("min_duration", "2"), ("max_duration", "2000")]),
            &catalog,
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(spec.min_duration, Some(120.0));
        assert_eq!(spec.max_duration, Some(2000.0));
    }

    #[tokio::test]
    async fn hide_watched_accepts_the_truthy_spellings() {
        let (catalog, cache) = seeded();
        for (key, value) in [
            ("hide-watched", "1"),
            ("hide_watched", "TRUE"),
            ("hideWatched", "yes"),
        ] {
            let spec = parse_filters(&qp(&[(key, value)]), &catalog, &cache).await.unwrap();
            assert!(spec.hide_watched, "{}={}", key, value);
        }
        let spec = parse_filters(&qp(&[("hide-watched", "no")]), &catalog, &cache)
            .await
            .unwrap();
        assert!(!spec.hide_watched);
    }

    #[tokio::test]
    async fn sort_aliases_and_fallback() {
        let (catalog, cache) = seeded();
        let cases = [
            ("recent", SortOrder::New),
            ("popular", SortOrder::New),
            ("duration", SortOrder::Long),
            ("duration_asc", SortOrder::Short),
            ("duration_desc", SortOrder::Long),
            ("OLD", SortOrder::Old),
            ("garbage", SortOrder::New),
        ];
        for (raw, expected) in cases {
            let spec = parse_filters(&qp(&[("sort", raw)]), &catalog, &cache).await.unwrap();
            assert_eq!(spec.sort, expected, "sort={}", raw);
        }
    }

    #[tokio::test]
    async fn text_falls_back_to_search_param() {
        let (catalog, cache) = seeded();
        let spec = parse_filters(&qp(&[("search", "weather")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.text, "weather");

        let spec = parse_filters(&qp(&[("text", ""), ("search", "news")]), &catalog, &cache)
            .await
            .unwrap();
        assert_eq!(spec.text, "news");
    }

    #[test]
    fn page_parse_clamps_negatives_and_garbage_to_zero() {
        assert_eq!(parse_page(&qp(&[("page", "3")])), 3);
        assert_eq!(parse_page(&qp(&[("page", "-2")])), 0);
        assert_eq!(parse_page(&qp(&[("page", "abc")])), 0);
        assert_eq!(parse_page(&qp(&[])), 0);
    }
}

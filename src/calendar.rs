use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::models::{DayActivity, ManualLogEntry, WatchLogEntry};

/// Merges the two per-user log sources into date-ascending per-day totals.
///
/// Watch log seconds sum into `on` under the calendar date of the entry.
/// Each manual log's `duration_seconds` is apportioned evenly across every
/// date in its inclusive start/end range into `off`; the per-day share stays
/// fractional so the shares re-sum to the original duration.
pub fn aggregate(
    watch: &[WatchLogEntry],
    manual: &[ManualLogEntry],
) -> Vec<(NaiveDate, DayActivity)> {
    let mut days: BTreeMap<NaiveDate, DayActivity> = BTreeMap::new();

    for entry in watch {
        let day = days
            .entry(entry.watched_at.date())
            .or_insert(DayActivity { on: 0, off: 0.0 });
        day.on += entry.watched_seconds as i64;
    }

    for entry in manual {
        let d1 = entry.started_at.date();
        let d2 = entry.ended_at.date();
        // Defensive floor: malformed rows with end before start still count
        // as a single day.
        let span = ((d2 - d1).num_days() + 1).max(1);
        let per_day = entry.duration_seconds as f64 / span as f64;
        for i in 0..span {
            let day = days
                .entry(d1 + Duration::days(i))
                .or_insert(DayActivity { on: 0, off: 0.0 });
            day.off += per_day;
        }
    }

    days.into_iter().collect()
}

/// Lifetime on/off totals in seconds, for the overall-progress endpoint.
pub fn total_seconds(watch: &[WatchLogEntry], manual: &[ManualLogEntry]) -> (i64, i64) {
    let on = watch.iter().map(|e| e.watched_seconds as i64).sum();
    let off = manual.iter().map(|e| e.duration_seconds as i64).sum();
    (on, off)
}

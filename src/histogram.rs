use crate::models::DurationBucket;

pub const BUCKET_WIDTH: i64 = 60;
/// Keeps the longest video's bucket off the axis end.
pub const UPPER_PAD: i64 = 20;

/// Fixed-width duration histogram over the duration-dataset. Buckets are
/// contiguous `[start, end)` ranges in seconds; every input lands in exactly
/// one bucket (out-of-range indexes clamp to the edge buckets).
pub fn build(durations: &[i32]) -> Vec<DurationBucket> {
    let mut upper: i64 = -1;
    for d in durations {
        upper = upper.max(*d as i64 + UPPER_PAD);
    }

    let n_buckets = ((upper + BUCKET_WIDTH - 1) / BUCKET_WIDTH).max(1) as usize;

    let mut counts = vec![0usize; n_buckets];
    for d in durations {
        let i = (*d as i64 / BUCKET_WIDTH).clamp(0, n_buckets as i64 - 1) as usize;
        counts[i] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| DurationBucket {
            count,
            start: i as i64 * BUCKET_WIDTH,
            end: (i as i64 + 1) * BUCKET_WIDTH,
        })
        .collect()
}

//! Pure operations over half-open intervals of instants: `[start, end)`.
//!
//! These three functions are the only place tie-break rules live. They are
//! total and synchronous; nothing here ever touches the store or the clock.

use chrono::{DateTime, Utc};
use std::cmp::{max, min};
use std::time::Duration as StdDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "interval must be non-empty: {start} .. {end}");
        Self { start, end }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        max(self.start, other.start) < min(self.end, other.end)
    }
}

/// At most one interval or none. Exists iff
/// `max(a.start, b.start) < min(a.end, b.end)`.
pub fn intersect(a: Interval, b: Interval) -> Option<Interval> {
    let start = max(a.start, b.start);
    let end = min(a.end, b.end);
    if start < end {
        Some(Interval { start, end })
    } else {
        None
    }
}

/// Removals are first filtered to those overlapping `source`, sorted
/// ascending by start, then a single pass emits the gap between a running
/// cursor and each removal's clamped start, advancing the cursor past each
/// removal. Overlapping removals still yield non-overlapping gaps. Emits
/// nothing when removals fully cover `source`.
pub fn subtract(source: Interval, removals: &[Interval]) -> Vec<Interval> {
    let mut clipped: Vec<Interval> = removals
        .iter()
        .filter(|r| r.overlaps(&source))
        .map(|r| Interval {
            start: max(r.start, source.start),
            end: min(r.end, source.end),
        })
        .collect();
    clipped.sort_by_key(|i| i.start);

    let mut result = Vec::new();
    let mut cursor = source.start;

    for removal in clipped {
        if removal.start > cursor {
            result.push(Interval {
                start: cursor,
                end: removal.start,
            });
        }
        cursor = max(cursor, removal.end);
    }

    if cursor < source.end {
        result.push(Interval {
            start: cursor,
            end: source.end,
        });
    }

    result
}

/// Ordered, fixed-duration sub-intervals packed greedily from `interval.start`.
/// A tail remainder shorter than `duration` is discarded.
pub fn chunk(duration: StdDuration, interval: Interval) -> Vec<Interval> {
    let duration = chrono::Duration::from_std(duration).expect("duration fits in chrono::Duration");
    if duration <= chrono::Duration::zero() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut cursor = interval.start;
    while cursor + duration <= interval.end {
        let end = cursor + duration;
        result.push(Interval { start: cursor, end });
        cursor = end;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, h, m, 0).unwrap()
    }

    fn iv(h1: u32, m1: u32, h2: u32, m2: u32) -> Interval {
        Interval::new(at(h1, m1), at(h2, m2))
    }

    #[test]
    fn intersect_is_symmetric() {
        let a = iv(9, 0, 12, 0);
        let b = iv(10, 0, 13, 0);
        assert_eq!(intersect(a, b), intersect(b, a));
    }

    #[test]
    fn intersect_is_idempotent_with_self() {
        let a = iv(9, 0, 12, 0);
        assert_eq!(intersect(a, a), Some(a));
    }

    #[test]
    fn intersect_none_when_disjoint() {
        let a = iv(9, 0, 10, 0);
        let b = iv(10, 0, 11, 0);
        assert_eq!(intersect(a, b), None);
    }

    #[test]
    fn subtract_completeness_and_disjointness() {
        let src = iv(9, 0, 17, 0);
        let removals = vec![iv(10, 0, 11, 0), iv(13, 0, 14, 0)];
        let gaps = subtract(src, &removals);

        assert_eq!(
            gaps,
            vec![iv(9, 0, 10, 0), iv(11, 0, 13, 0), iv(14, 0, 17, 0)]
        );

        for pair in gaps.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn subtract_with_overlapping_removals_still_yields_disjoint_gaps() {
        let src = iv(9, 0, 17, 0);
        let removals = vec![iv(10, 0, 12, 0), iv(11, 0, 13, 0)];
        let gaps = subtract(src, &removals);
        assert_eq!(gaps, vec![iv(9, 0, 10, 0), iv(13, 0, 17, 0)]);
    }

    #[test]
    fn subtract_fully_covered_emits_nothing() {
        let src = iv(9, 0, 10, 0);
        let removals = vec![iv(8, 0, 11, 0)];
        assert!(subtract(src, &removals).is_empty());
    }

    #[test]
    fn subtract_ignores_removals_outside_source() {
        let src = iv(9, 0, 10, 0);
        let removals = vec![iv(11, 0, 12, 0)];
        assert_eq!(subtract(src, &removals), vec![src]);
    }

    #[test]
    fn chunk_tiles_with_no_remainder_dropped_mid_sequence() {
        let i = iv(12, 0, 17, 0);
        let chunks = chunk(StdDuration::from_secs(30 * 60), i);
        assert_eq!(chunks.len(), 10);
        assert_eq!(chunks[0], iv(12, 0, 12, 30));
        assert_eq!(chunks.last().unwrap(), &iv(16, 30, 17, 0));
        for w in chunks.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn chunk_discards_short_tail() {
        let i = Interval::new(at(12, 0), at(12, 0) + chrono::Duration::minutes(45));
        let chunks = chunk(StdDuration::from_secs(30 * 60), i);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], Interval::new(at(12, 0), at(12, 30)));
    }

    #[test]
    fn half_open_semantics_booking_does_not_conflict_with_adjacent_slot() {
        let booking = iv(9, 0, 9, 30);
        let slot = iv(9, 30, 10, 0);
        assert!(!booking.overlaps(&slot));
        assert_eq!(intersect(booking, slot), None);
    }
}

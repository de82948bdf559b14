use chrono::{NaiveTime, Timelike};

use crate::models::planning::TimeInterval;

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

/// Removes `cut` from every interval in `free`, keeping the list sorted and disjoint.
pub fn subtract_interval(free: &[TimeInterval], cut: &TimeInterval) -> Vec<TimeInterval> {
    let mut remaining = Vec::with_capacity(free.len() + 1);
    for interval in free {
        if !interval.overlaps(cut) {
            remaining.push(*interval);
            continue;
        }
        if interval.start < cut.start {
            remaining.push(TimeInterval::new(interval.start, cut.start));
        }
        if cut.end < interval.end {
            remaining.push(TimeInterval::new(cut.end, interval.end));
        }
    }
    remaining
}

/// Sorts and coalesces touching or overlapping intervals.
pub fn merge_intervals(mut intervals: Vec<TimeInterval>) -> Vec<TimeInterval> {
    intervals.retain(|interval| !interval.is_empty());
    intervals.sort();
    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

pub fn total_minutes(intervals: &[TimeInterval]) -> i64 {
    intervals.iter().map(TimeInterval::duration_minutes).sum()
}

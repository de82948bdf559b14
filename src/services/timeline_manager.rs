use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, trace};

use crate::error::{PlannerError, PlannerResult};
use crate::models::planning::{PlanningTask, TimeInterval};
use crate::models::settings::WorkHours;
use crate::services::schedule_utils::{merge_intervals, subtract_interval, total_minutes};

#[derive(Debug, Clone)]
struct DayTimeline {
    span: TimeInterval,
    free: Vec<TimeInterval>,
    consumed: Vec<TimeInterval>,
}

impl DayTimeline {
    fn new(span: TimeInterval) -> Self {
        Self {
            span,
            free: if span.is_empty() { Vec::new() } else { vec![span] },
            consumed: Vec::new(),
        }
    }

    fn take(&mut self, interval: TimeInterval) {
        self.free = subtract_interval(&self.free, &interval);
        let mut consumed = std::mem::take(&mut self.consumed);
        consumed.push(interval);
        self.consumed = merge_intervals(consumed);
    }

    fn give_back(&mut self, interval: TimeInterval) {
        self.consumed = subtract_interval(&self.consumed, &interval);
        let mut free = std::mem::take(&mut self.free);
        free.push(interval);
        self.free = merge_intervals(free);
    }
}

/// Free/busy bookkeeping for every date in scope.
///
/// For each date the free and consumed interval lists are sorted, disjoint and
/// together cover exactly the date's working span.
#[derive(Debug, Clone)]
pub struct TimelineManager {
    days: BTreeMap<NaiveDate, DayTimeline>,
    pending_period_tasks: BTreeMap<NaiveDate, Vec<PlanningTask>>,
}

impl TimelineManager {
    /// Builds one working span per date and consumes whatever lies before `now`.
    pub fn new(dates: &[NaiveDate], work_hours: WorkHours, now: NaiveDateTime) -> Self {
        let mut days = BTreeMap::new();
        for date in dates {
            let mut day = DayTimeline::new(work_hours.span_for(*date));
            if day.span.start < now {
                let elapsed = TimeInterval::new(day.span.start, now.min(day.span.end));
                trace!(target: "planner::timeline", %date, start = %elapsed.start, end = %elapsed.end, "consuming elapsed time");
                day.take(elapsed);
            }
            days.insert(*date, day);
        }
        debug!(target: "planner::timeline", dates = days.len(), "timeline initialized");
        Self {
            days,
            pending_period_tasks: BTreeMap::new(),
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn span(&self, date: NaiveDate) -> Option<TimeInterval> {
        self.days.get(&date).map(|day| day.span)
    }

    pub fn free_intervals(&self, date: NaiveDate) -> &[TimeInterval] {
        self.days
            .get(&date)
            .map(|day| day.free.as_slice())
            .unwrap_or(&[])
    }

    pub fn consumed_intervals(&self, date: NaiveDate) -> &[TimeInterval] {
        self.days
            .get(&date)
            .map(|day| day.consumed.as_slice())
            .unwrap_or(&[])
    }

    pub fn free_minutes(&self, date: NaiveDate) -> i64 {
        total_minutes(self.free_intervals(date))
    }

    /// Marks `[start, end)` consumed. The range must sit inside a single free interval.
    pub fn reserve(
        &mut self,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PlannerResult<()> {
        let requested = TimeInterval::new(start, end);
        let day = self
            .days
            .get_mut(&date)
            .ok_or_else(|| PlannerError::interval_not_free(date, start, end))?;
        if requested.is_empty() || !day.free.iter().any(|free| free.contains(&requested)) {
            return Err(PlannerError::interval_not_free(date, start, end));
        }
        day.take(requested);
        trace!(target: "planner::timeline", %date, %start, %end, "reserved");
        Ok(())
    }

    /// Returns a previously reserved range to the free list.
    pub fn release(
        &mut self,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> PlannerResult<()> {
        let released = TimeInterval::new(start, end);
        let day = self.days.get_mut(&date).ok_or_else(|| {
            PlannerError::invariant(format!("release on unknown date {date}"))
        })?;
        if released.is_empty() || !day.consumed.iter().any(|used| used.contains(&released)) {
            return Err(PlannerError::invariant(format!(
                "release of {start} - {end} on {date} was never reserved"
            )));
        }
        day.give_back(released);
        trace!(target: "planner::timeline", %date, %start, %end, "released");
        Ok(())
    }

    /// Consumes whatever part of `interval` overlaps any working span, free or not.
    /// Fixed tasks use this since they keep their time regardless of working hours.
    pub fn block(&mut self, interval: TimeInterval) {
        for (date, day) in self.days.iter_mut() {
            if let Some(overlap) = day.span.intersection(&interval) {
                trace!(target: "planner::timeline", %date, start = %overlap.start, end = %overlap.end, "blocked");
                day.take(overlap);
            }
        }
    }

    pub fn add_pending_period_task(&mut self, date: NaiveDate, task: PlanningTask) {
        self.pending_period_tasks.entry(date).or_default().push(task);
    }

    pub fn pending_period_tasks(&self) -> &BTreeMap<NaiveDate, Vec<PlanningTask>> {
        &self.pending_period_tasks
    }

    pub fn take_pending_period_tasks(&mut self, date: NaiveDate) -> Vec<PlanningTask> {
        self.pending_period_tasks.remove(&date).unwrap_or_default()
    }

    /// True when free ∪ consumed is exactly the working span and both lists are disjoint.
    pub fn is_consistent(&self, date: NaiveDate) -> bool {
        let Some(day) = self.days.get(&date) else {
            return false;
        };
        let sorted_disjoint = |list: &[TimeInterval]| {
            list.windows(2).all(|pair| pair[0].end < pair[1].start)
                && list.iter().all(|interval| !interval.is_empty())
        };
        if !sorted_disjoint(&day.free) || !sorted_disjoint(&day.consumed) {
            return false;
        }
        let overlapping = day
            .free
            .iter()
            .any(|free| day.consumed.iter().any(|used| used.overlaps(free)));
        let union = merge_intervals(day.free.iter().chain(day.consumed.iter()).copied().collect());
        let expected: Vec<TimeInterval> = if day.span.is_empty() {
            Vec::new()
        } else {
            vec![day.span]
        };
        !overlapping && union == expected
    }
}

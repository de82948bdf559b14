use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{PlannerError, PlannerResult};
use crate::models::planning::{
    ConflictItem, ConflictType, DayOrganization, ExpiredTaskItem, Occurrence, PlacementTuning,
    PlanningContext, PlanningTask, ScheduledTaskItem, SplitPart, TaskOrigin, TimeInterval,
};
use crate::models::settings::DayPeriodBounds;
use crate::models::task::{DayPeriod, Priority};
use crate::services::timeline_manager::TimelineManager;

/// Where a flexible task may go.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRequest {
    /// Tried in order; dates outside the timeline are ignored.
    pub candidate_dates: Vec<NaiveDate>,
    pub period: DayPeriod,
    /// Every fragment must end by this instant.
    pub deadline: Option<NaiveDateTime>,
}

impl PlacementRequest {
    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            candidate_dates: vec![date],
            period: DayPeriod::None,
            deadline: None,
        }
    }

    pub fn anywhere(dates: Vec<NaiveDate>) -> Self {
        Self {
            candidate_dates: dates,
            period: DayPeriod::None,
            deadline: None,
        }
    }

    pub fn with_period(mut self, period: DayPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<NaiveDateTime>) -> Self {
        self.deadline = deadline;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Number of scheduled fragments.
    Placed(usize),
    Conflict(ConflictType),
    Expired,
}

/// One free stretch a task may use, after period and deadline clipping.
#[derive(Debug, Clone, Copy)]
struct Window {
    date: NaiveDate,
    interval: TimeInterval,
    /// Starts right where consumed time ends. Only such windows get a lead
    /// buffer; span and period boundaries have nothing to buffer against.
    follows_busy: bool,
}

#[derive(Debug, Clone, Copy)]
struct Reservation {
    date: NaiveDate,
    reserved: TimeInterval,
    task_time: TimeInterval,
}

/// Allocates tasks onto the timeline and records what could not be placed.
#[derive(Debug, Clone)]
pub struct TaskPlacer {
    organization: DayOrganization,
    tuning: PlacementTuning,
    day_periods: DayPeriodBounds,
    allow_splitting: bool,
    now: NaiveDateTime,
}

impl TaskPlacer {
    pub fn new(
        organization: DayOrganization,
        tuning: PlacementTuning,
        day_periods: DayPeriodBounds,
        allow_splitting: bool,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            organization,
            tuning,
            day_periods,
            allow_splitting,
            now,
        }
    }

    /// Schedules fixed occurrences at their exact time. Every overlapping pair
    /// yields one FIXED_VS_FIXED conflict and none of the overlapping
    /// occurrences is scheduled.
    pub fn place_fixed_tasks(
        &self,
        occurrences: Vec<Occurrence>,
        timeline: &mut TimelineManager,
        context: &mut PlanningContext,
    ) {
        let mut excluded = vec![false; occurrences.len()];
        for i in 0..occurrences.len() {
            for j in (i + 1)..occurrences.len() {
                let (a, b) = (occurrences[i].interval(), occurrences[j].interval());
                if a.is_empty() || b.is_empty() || !a.overlaps(&b) {
                    continue;
                }
                excluded[i] = true;
                excluded[j] = true;
                let first = &occurrences[i].planning_task.task;
                let second = &occurrences[j].planning_task.task;
                debug!(
                    target: "planner::placer",
                    first = %first.id,
                    second = %second.id,
                    "fixed tasks overlap"
                );
                context.add_conflict(ConflictItem {
                    tasks: vec![first.clone(), second.clone()],
                    reason: format!(
                        "\"{}\" and \"{}\" are fixed at overlapping times",
                        first.name, second.name
                    ),
                    contested_time: a.intersection(&b),
                    conflict_type: ConflictType::FixedVsFixed,
                });
            }
        }

        for (occurrence, skip) in occurrences.into_iter().zip(excluded) {
            if skip {
                continue;
            }
            let interval = occurrence.interval();
            timeline.block(interval);
            debug!(
                target: "planner::placer",
                task_id = %occurrence.planning_task.task.id,
                start = %interval.start,
                end = %interval.end,
                "fixed task scheduled"
            );
            context.add_scheduled(ScheduledTaskItem {
                task: occurrence.planning_task.task,
                start: interval.start,
                end: interval.end,
                date: occurrence.start.date(),
                split_part: None,
            });
        }
    }

    /// Finds room for a flexible task. Failures never propagate: they end up in
    /// the context as a conflict, or as an unresolved expired task when the task
    /// was re-anchored by the overdue policy.
    pub fn place_prioritized_task(
        &self,
        planning_task: PlanningTask,
        request: &PlacementRequest,
        timeline: &mut TimelineManager,
        context: &mut PlanningContext,
    ) -> PlacementOutcome {
        let windows = self.windows(request, timeline);
        self.place_in_windows(planning_task, request, &windows, timeline, context)
    }

    /// Places into precomputed windows. The timeline stays authoritative: a
    /// window that is no longer free aborts the placement as PLACEMENT_FAILED.
    fn place_in_windows(
        &self,
        planning_task: PlanningTask,
        request: &PlacementRequest,
        windows: &[Window],
        timeline: &mut TimelineManager,
        context: &mut PlanningContext,
    ) -> PlacementOutcome {
        let duration = planning_task.remaining_minutes.max(0);

        let placed = if duration == 0 {
            self.place_instant(&planning_task, windows, context)
        } else {
            match self.place_whole(&planning_task, duration, windows, timeline) {
                Ok(Some(reservation)) => {
                    self.commit(&planning_task, &[reservation], context);
                    Some(1)
                }
                Ok(None) if self.allow_splitting && planning_task.splittable => {
                    match self.place_split(&planning_task, duration, windows, timeline) {
                        Ok(Some(reservations)) => {
                            self.commit(&planning_task, &reservations, context);
                            Some(reservations.len())
                        }
                        Ok(None) => None,
                        Err(err) => return self.record_failure(planning_task, &err, context),
                    }
                }
                Ok(None) => None,
                Err(err) => return self.record_failure(planning_task, &err, context),
            }
        };

        match placed {
            Some(fragments) => PlacementOutcome::Placed(fragments),
            None => self.record_no_slot(planning_task, request, duration, context),
        }
    }

    fn windows(&self, request: &PlacementRequest, timeline: &TimelineManager) -> Vec<Window> {
        let mut windows = Vec::new();
        for date in &request.candidate_dates {
            let Some(span) = timeline.span(*date) else {
                continue;
            };
            let period_window = self
                .day_periods
                .range_for(request.period)
                .map(|range| range.interval_on(*date));
            for free in timeline.free_intervals(*date) {
                let mut interval = Some(*free);
                if let Some(period) = period_window {
                    interval = interval.and_then(|i| i.intersection(&period));
                }
                if let Some(deadline) = request.deadline {
                    interval = interval.and_then(|i| {
                        (i.start < deadline).then(|| TimeInterval::new(i.start, i.end.min(deadline)))
                    });
                }
                if let Some(interval) = interval {
                    windows.push(Window {
                        date: *date,
                        interval,
                        follows_busy: interval.start == free.start && free.start != span.start,
                    });
                }
            }
        }
        windows
    }

    fn place_instant(
        &self,
        planning_task: &PlanningTask,
        windows: &[Window],
        context: &mut PlanningContext,
    ) -> Option<usize> {
        let window = windows.first()?;
        let at = window.interval.start;
        self.commit(
            planning_task,
            &[Reservation {
                date: window.date,
                reserved: TimeInterval::new(at, at),
                task_time: TimeInterval::new(at, at),
            }],
            context,
        );
        Some(1)
    }

    /// Earliest window holding the whole task. Buffers are soft: they shrink to
    /// whatever the window has left once the task itself fits.
    fn place_whole(
        &self,
        planning_task: &PlanningTask,
        duration: i64,
        windows: &[Window],
        timeline: &mut TimelineManager,
    ) -> PlannerResult<Option<Reservation>> {
        let (lead, trail) = self.buffers(planning_task);
        let Some(window) = windows
            .iter()
            .find(|window| window.interval.duration_minutes() >= duration)
        else {
            return Ok(None);
        };

        let slack = window.interval.duration_minutes() - duration;
        let lead = if window.follows_busy { lead.min(slack) } else { 0 };
        let trail = trail.min(slack - lead);

        let task_start = window.interval.start + Duration::minutes(lead);
        let task_end = task_start + Duration::minutes(duration);
        let reserved = TimeInterval::new(window.interval.start, task_end + Duration::minutes(trail));
        timeline.reserve(window.date, reserved.start, reserved.end)?;
        Ok(Some(Reservation {
            date: window.date,
            reserved,
            task_time: TimeInterval::new(task_start, task_end),
        }))
    }

    /// All-or-nothing: fragments are reserved only once the windows can cover the
    /// whole duration. Fragments under `min_split_minutes` are skipped unless
    /// they finish the task.
    fn place_split(
        &self,
        planning_task: &PlanningTask,
        duration: i64,
        windows: &[Window],
        timeline: &mut TimelineManager,
    ) -> PlannerResult<Option<Vec<Reservation>>> {
        let mut remaining = duration;
        let mut planned = Vec::new();
        for window in windows {
            if remaining == 0 {
                break;
            }
            let take = window.interval.duration_minutes().min(remaining);
            if take <= 0 || (take < self.tuning.min_split_minutes && take < remaining) {
                continue;
            }
            let task_time = TimeInterval::new(
                window.interval.start,
                window.interval.start + Duration::minutes(take),
            );
            planned.push(Reservation {
                date: window.date,
                reserved: task_time,
                task_time,
            });
            remaining -= take;
        }
        if remaining > 0 {
            debug!(
                target: "planner::placer",
                task_id = %planning_task.task.id,
                missing_minutes = remaining,
                "not enough free time to split into"
            );
            return Ok(None);
        }

        let mut committed: Vec<Reservation> = Vec::with_capacity(planned.len());
        for reservation in planned {
            let reserved = reservation.reserved;
            if let Err(err) = timeline.reserve(reservation.date, reserved.start, reserved.end) {
                for done in committed.iter().rev() {
                    timeline.release(done.date, done.reserved.start, done.reserved.end)?;
                }
                return Err(err);
            }
            committed.push(reservation);
        }
        Ok(Some(committed))
    }

    fn buffers(&self, planning_task: &PlanningTask) -> (i64, i64) {
        match self.organization {
            DayOrganization::MaximizeProductivity => (0, 0),
            DayOrganization::FocusUrgentBuffer if self.is_urgent(planning_task) => (
                self.tuning.urgent_buffer_minutes,
                self.tuning.urgent_buffer_minutes,
            ),
            DayOrganization::FocusUrgentBuffer => (0, 0),
            DayOrganization::LooseScheduleBreaks => (0, self.tuning.break_minutes),
        }
    }

    /// High priority, or a deadline inside the urgent horizon.
    pub fn is_urgent(&self, planning_task: &PlanningTask) -> bool {
        if planning_task.task.priority == Priority::High {
            return true;
        }
        let horizon = self.now + Duration::hours(self.tuning.urgent_horizon_hours);
        matches!(planning_task.task.deadline(), Some(deadline) if deadline <= horizon)
    }

    fn commit(
        &self,
        planning_task: &PlanningTask,
        reservations: &[Reservation],
        context: &mut PlanningContext,
    ) {
        let count = reservations.len() as u32;
        for (idx, reservation) in reservations.iter().enumerate() {
            debug!(
                target: "planner::placer",
                task_id = %planning_task.task.id,
                date = %reservation.date,
                start = %reservation.task_time.start,
                end = %reservation.task_time.end,
                "flexible task scheduled"
            );
            context.add_scheduled(ScheduledTaskItem {
                task: planning_task.task.clone(),
                start: reservation.task_time.start,
                end: reservation.task_time.end,
                date: reservation.date,
                split_part: (count > 1).then_some(SplitPart {
                    index: idx as u32 + 1,
                    count,
                }),
            });
        }
    }

    fn record_no_slot(
        &self,
        planning_task: PlanningTask,
        request: &PlacementRequest,
        duration: i64,
        context: &mut PlanningContext,
    ) -> PlacementOutcome {
        let reason = match request.deadline {
            Some(deadline) => format!("no free slot of {duration} minutes before {deadline}"),
            None => format!("no free slot of {duration} minutes in scope"),
        };
        if let TaskOrigin::Overdue(policy) = planning_task.origin {
            debug!(target: "planner::placer", task_id = %planning_task.task.id, %reason, "re-anchored overdue task did not fit");
            context.add_expired(ExpiredTaskItem {
                task: planning_task.task,
                policy,
                reason,
            });
            return PlacementOutcome::Expired;
        }

        debug!(target: "planner::placer", task_id = %planning_task.task.id, %reason, "no slot in scope");
        context.add_conflict(ConflictItem {
            tasks: vec![planning_task.task],
            reason,
            contested_time: None,
            conflict_type: ConflictType::NoSlotInScope,
        });
        PlacementOutcome::Conflict(ConflictType::NoSlotInScope)
    }

    fn record_failure(
        &self,
        planning_task: PlanningTask,
        err: &PlannerError,
        context: &mut PlanningContext,
    ) -> PlacementOutcome {
        warn!(
            target: "planner::placer",
            task_id = %planning_task.task.id,
            error = %err,
            invariant = err.is_invariant_violation(),
            "placement aborted"
        );
        let contested_time = match err {
            PlannerError::IntervalNotFree { start, end, .. } => Some(TimeInterval::new(*start, *end)),
            _ => None,
        };
        context.add_conflict(ConflictItem {
            tasks: vec![planning_task.task],
            reason: format!("placement aborted: {err}"),
            contested_time,
            conflict_type: ConflictType::PlacementFailed,
        });
        PlacementOutcome::Conflict(ConflictType::PlacementFailed)
    }
}

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::models::planning::{ConflictItem, ConflictType, ExpiredTaskItem, ResolutionOption};
use crate::models::task::{Task, TimePlan};

impl ResolutionOption {
    /// Returns the task to feed into the next planning run.
    ///
    /// Exact start/end pairs are folded into an explicit duration before the
    /// plans are replaced, so the task keeps its length.
    pub fn apply(&self, task: &Task, today: NaiveDate) -> Task {
        let mut updated = task.clone();
        match self {
            ResolutionOption::LeaveItLikeThat => return updated,
            ResolutionOption::MoveToNearestFree => {
                keep_duration(&mut updated);
                updated.start_time_plan = None;
                updated.end_time_plan = None;
            }
            ResolutionOption::MoveToTomorrow => {
                keep_duration(&mut updated);
                let period = task
                    .start_time_plan
                    .as_ref()
                    .map(|plan| plan.day_period)
                    .unwrap_or_default();
                updated.start_time_plan =
                    Some(TimePlan::in_period(today + Duration::days(1), period));
                updated.end_time_plan = None;
            }
            ResolutionOption::ManuallySchedule { at } => {
                keep_duration(&mut updated);
                updated.start_time_plan = Some(TimePlan::at(*at));
                updated.end_time_plan = None;
            }
        }
        debug!(target: "planner::run", task_id = %task.id, option = ?self, "resolution applied");
        updated
    }
}

fn keep_duration(task: &mut Task) {
    if task.duration_minutes.is_none() {
        let exact = task
            .start_time_plan
            .as_ref()
            .and_then(TimePlan::date_time)
            .zip(task.end_time_plan.as_ref().and_then(TimePlan::date_time));
        if let Some((start, end)) = exact {
            task.duration_minutes = Some((end - start).num_minutes().max(0));
        }
    }
}

impl ConflictItem {
    /// Options that make sense for this conflict. Manual scheduling is offered
    /// right after the contested time when there is one.
    pub fn resolution_options(&self) -> Vec<ResolutionOption> {
        match self.conflict_type {
            ConflictType::FixedVsFixed => {
                let mut options = vec![
                    ResolutionOption::MoveToNearestFree,
                    ResolutionOption::MoveToTomorrow,
                ];
                if let Some(contested) = self.contested_time {
                    options.push(ResolutionOption::ManuallySchedule { at: contested.end });
                }
                options.push(ResolutionOption::LeaveItLikeThat);
                options
            }
            ConflictType::NoSlotInScope | ConflictType::PlacementFailed => vec![
                ResolutionOption::MoveToTomorrow,
                ResolutionOption::LeaveItLikeThat,
            ],
        }
    }
}

impl ExpiredTaskItem {
    pub fn resolution_options(&self) -> Vec<ResolutionOption> {
        vec![
            ResolutionOption::MoveToNearestFree,
            ResolutionOption::MoveToTomorrow,
            ResolutionOption::LeaveItLikeThat,
        ]
    }
}

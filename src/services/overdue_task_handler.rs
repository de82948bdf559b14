use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::planning::{ExpiredTaskItem, OverdueTaskHandling, PlanningTask, TaskOrigin};
use crate::models::task::{DayPeriod, Task, TimePlan};

#[derive(Debug, Default)]
pub struct OverdueOutcome {
    /// Every task that continues to categorization, overdue ones re-anchored.
    pub tasks: Vec<PlanningTask>,
    pub rescheduled: Vec<String>,
    pub unresolved: Vec<ExpiredTaskItem>,
}

/// Applies the overdue policy before categorization so nothing downstream
/// sees an expired time plan.
pub struct OverdueTaskHandler {
    policy: OverdueTaskHandling,
    now: NaiveDateTime,
    scope_dates: Vec<NaiveDate>,
}

impl OverdueTaskHandler {
    pub fn new(policy: OverdueTaskHandling, now: NaiveDateTime, scope_dates: &[NaiveDate]) -> Self {
        Self {
            policy,
            now,
            scope_dates: scope_dates.to_vec(),
        }
    }

    /// Deadline (end plan, else start plan) strictly before `now`. Completed and
    /// recurring tasks are never overdue.
    pub fn is_overdue(task: &Task, now: NaiveDateTime) -> bool {
        if task.is_completed || task.is_recurring() {
            return false;
        }
        task.end_time_plan
            .as_ref()
            .or(task.start_time_plan.as_ref())
            .map(|plan| plan.latest_instant() < now)
            .unwrap_or(false)
    }

    pub fn process(&self, tasks: Vec<PlanningTask>) -> OverdueOutcome {
        let mut outcome = OverdueOutcome::default();
        for planning_task in tasks {
            if !Self::is_overdue(&planning_task.task, self.now) {
                outcome.tasks.push(planning_task);
                continue;
            }

            match self.re_anchor(&planning_task) {
                Ok(task) => {
                    debug!(
                        target: "planner::overdue",
                        task_id = %planning_task.task.id,
                        policy = ?self.policy,
                        "overdue task re-anchored"
                    );
                    outcome.rescheduled.push(planning_task.task.id.clone());
                    outcome.tasks.push(
                        PlanningTask {
                            task,
                            ..planning_task
                        }
                        .with_origin(TaskOrigin::Overdue(self.policy)),
                    );
                }
                Err(reason) => {
                    debug!(
                        target: "planner::overdue",
                        task_id = %planning_task.task.id,
                        %reason,
                        "overdue task left unresolved"
                    );
                    outcome.unresolved.push(ExpiredTaskItem {
                        task: planning_task.task,
                        policy: self.policy,
                        reason,
                    });
                }
            }
        }
        outcome
    }

    /// The re-anchored copy keeps its required minutes as an explicit duration,
    /// so dropping an exact start/end pair does not change how long it takes.
    fn re_anchor(&self, planning_task: &PlanningTask) -> Result<Task, String> {
        let original = &planning_task.task;
        let mut task = original.clone();
        task.duration_minutes = Some(planning_task.remaining_minutes);
        task.end_time_plan = None;

        match self.policy {
            OverdueTaskHandling::ManageWhenFree => {
                task.start_time_plan = None;
            }
            OverdueTaskHandling::AddTodayFreeTime => {
                let today = self.now.date();
                if !self.scope_dates.contains(&today) {
                    return Err("today is outside the schedule scope".to_string());
                }
                task.start_time_plan = Some(TimePlan::on_date(today));
            }
            OverdueTaskHandling::PostponeToTomorrow => {
                let tomorrow = self.now.date() + Duration::days(1);
                if !self.scope_dates.contains(&tomorrow) {
                    return Err("tomorrow is outside the schedule scope".to_string());
                }
                let period = original
                    .start_time_plan
                    .as_ref()
                    .or(original.end_time_plan.as_ref())
                    .map(|plan| plan.day_period)
                    .unwrap_or(DayPeriod::None);
                task.start_time_plan = Some(TimePlan::in_period(tomorrow, period));
            }
        }
        Ok(task)
    }
}

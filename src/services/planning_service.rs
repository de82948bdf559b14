use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PlannerError, PlannerResult};
use crate::models::planning::{PlannerInput, PlannerOutput, PlanningContext, PlanningTask};
use crate::services::overdue_task_handler::OverdueTaskHandler;
use crate::services::task_categorizer::TaskCategorizer;
use crate::services::task_placer::{PlacementRequest, TaskPlacer};
use crate::services::task_prioritizer::TaskPrioritizer;
use crate::services::timeline_manager::TimelineManager;

/// Builds a day or week plan from a flat task list.
///
/// A run is single-pass and owns all of its state. Only malformed input fails
/// the call; every scheduling failure is reported inside the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratePlanUseCase;

impl GeneratePlanUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn invoke(&self, input: PlannerInput) -> PlannerResult<PlannerOutput> {
        input.validate()?;

        let session_id = Uuid::new_v4().to_string();
        let now = input.now;
        let scope_dates = input.scope_dates();
        let mut context = PlanningContext::new();
        info!(
            target: "planner::run",
            %session_id,
            %now,
            tasks = input.tasks.len(),
            scope = ?input.schedule_scope,
            strategy = ?input.prioritization_strategy,
            organization = ?input.day_organization,
            "planning run started"
        );

        let active: Vec<PlanningTask> = input
            .tasks
            .into_iter()
            .filter(|task| !task.is_completed)
            .map(|task| PlanningTask::new(task, input.tuning.default_task_minutes))
            .collect();

        let overdue = OverdueTaskHandler::new(input.overdue_task_handling, now, &scope_dates)
            .process(active);
        for item in overdue.unresolved {
            context.add_expired(item);
        }
        if !overdue.rescheduled.is_empty() {
            debug!(target: "planner::run", rescheduled = ?overdue.rescheduled, "overdue tasks re-anchored");
        }

        let buckets =
            TaskCategorizer::new(now, &scope_dates, input.allow_splitting).categorize(overdue.tasks);

        let mut timeline = TimelineManager::new(&scope_dates, input.work_hours, now);
        for (date, tasks) in buckets.period_tasks_pending {
            for task in tasks {
                timeline.add_pending_period_task(date, task);
            }
        }

        let placer = TaskPlacer::new(
            input.day_organization,
            input.tuning,
            input.day_periods,
            input.allow_splitting,
            now,
        );
        let prioritizer = TaskPrioritizer::new(input.prioritization_strategy, now);

        placer.place_fixed_tasks(buckets.fixed_occurrences, &mut timeline, &mut context);

        let mut date_flex = buckets.date_flex_pending;
        for date in timeline.dates() {
            let period_tasks = prioritizer.prioritize(timeline.take_pending_period_tasks(date));
            for task in period_tasks {
                let period = task
                    .task
                    .start_time_plan
                    .as_ref()
                    .map(|plan| plan.day_period)
                    .unwrap_or_default();
                let request = PlacementRequest::on_date(date)
                    .with_period(period)
                    .with_deadline(task.task.deadline());
                placer.place_prioritized_task(task, &request, &mut timeline, &mut context);
            }

            let dated_tasks = prioritizer.prioritize(date_flex.remove(&date).unwrap_or_default());
            for task in dated_tasks {
                let request = PlacementRequest::on_date(date).with_deadline(task.task.deadline());
                placer.place_prioritized_task(task, &request, &mut timeline, &mut context);
            }
        }

        let mut flexible = buckets.deadline_flexible_tasks;
        flexible.extend(buckets.fully_flexible_tasks);
        for task in prioritizer.prioritize(flexible) {
            let request =
                PlacementRequest::anywhere(timeline.dates()).with_deadline(task.task.deadline());
            placer.place_prioritized_task(task, &request, &mut timeline, &mut context);
        }

        for task in buckets.out_of_scope {
            context.add_out_of_scope(task);
        }

        let output = context.into_output(session_id, now);
        let summary = output.summary();
        info!(
            target: "planner::run",
            session_id = %output.session_id,
            scheduled_items = summary.scheduled_items,
            scheduled_tasks = summary.scheduled_tasks,
            conflicts = summary.conflicts,
            unresolved_expired = summary.unresolved_expired,
            out_of_scope = summary.out_of_scope,
            "planning run finished"
        );
        Ok(output)
    }

    /// Runs [`invoke`](Self::invoke) on the blocking pool for async callers.
    pub async fn invoke_async(&self, input: PlannerInput) -> PlannerResult<PlannerOutput> {
        let use_case = *self;
        tokio::task::spawn_blocking(move || use_case.invoke(input))
            .await
            .map_err(|err| PlannerError::other(format!("planning task failed to complete: {err}")))?
    }
}

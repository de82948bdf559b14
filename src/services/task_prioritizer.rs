use std::cmp::Ordering;

use chrono::NaiveDateTime;

use crate::models::planning::{PlanningTask, PrioritizationStrategy};

const DEADLINE_MINUTE_WEIGHT: f64 = 10.0;
/// Below any dated score for deadlines within the supported calendar.
const UNDATED_SCORE: f64 = -1.0e12;

/// Scores flexible tasks; higher scores are placed first.
#[derive(Debug, Clone, Copy)]
pub struct TaskPrioritizer {
    strategy: PrioritizationStrategy,
    reference_time: NaiveDateTime,
}

impl TaskPrioritizer {
    pub fn new(strategy: PrioritizationStrategy, reference_time: NaiveDateTime) -> Self {
        Self {
            strategy,
            reference_time,
        }
    }

    pub fn score(&self, task: &PlanningTask) -> f64 {
        Self::calculate_robust_score(task, self.strategy, self.reference_time)
    }

    /// Deterministic for identical inputs. Tasks without a deadline get no
    /// urgency; past-due deadlines get full urgency.
    pub fn calculate_robust_score(
        task: &PlanningTask,
        strategy: PrioritizationStrategy,
        reference_time: NaiveDateTime,
    ) -> f64 {
        let priority = task.task.priority.weight();
        let minutes_left = task
            .task
            .deadline()
            .map(|deadline| (deadline - reference_time).num_minutes());
        let urgency = match minutes_left {
            None => 0.0,
            Some(minutes) if minutes <= 0 => 1.0,
            Some(minutes) => 1.0 / (1.0 + minutes as f64 / (24.0 * 60.0)),
        };

        match strategy {
            PrioritizationStrategy::UrgentFirst => urgency * 100.0 + priority * 10.0,
            PrioritizationStrategy::HighPriorityFirst => priority * 100.0 + urgency * 10.0,
            PrioritizationStrategy::ShortTasksFirst => {
                10_000.0 / (task.remaining_minutes.max(0) as f64 + 1.0) + priority
            }
            // Each minute outweighs the largest priority weight, so priority
            // only breaks ties between equal deadlines. Any deadline beats none.
            PrioritizationStrategy::EarlierDeadlinesFirst => match minutes_left {
                Some(minutes) => -(minutes as f64) * DEADLINE_MINUTE_WEIGHT + priority,
                None => UNDATED_SCORE + priority,
            },
        }
    }

    /// Stable descending sort; equal scores keep input order.
    pub fn prioritize(&self, tasks: Vec<PlanningTask>) -> Vec<PlanningTask> {
        let mut scored: Vec<(f64, PlanningTask)> =
            tasks.into_iter().map(|task| (self.score(&task), task)).collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.into_iter().map(|(_, task)| task).collect()
    }
}

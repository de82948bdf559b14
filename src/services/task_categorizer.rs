use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::planning::{Occurrence, PlanningTask};
use crate::models::task::{Task, TimePlan};
use crate::services::recurrence_expander::RecurrenceExpander;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedTasks {
    pub fixed_occurrences: Vec<Occurrence>,
    pub period_tasks_pending: BTreeMap<NaiveDate, Vec<PlanningTask>>,
    pub date_flex_pending: BTreeMap<NaiveDate, Vec<PlanningTask>>,
    pub deadline_flexible_tasks: Vec<PlanningTask>,
    pub fully_flexible_tasks: Vec<PlanningTask>,
    /// Non-recurring tasks pinned to a date outside the scope.
    pub out_of_scope: Vec<Task>,
}

impl CategorizedTasks {
    pub fn is_empty(&self) -> bool {
        self.fixed_occurrences.is_empty()
            && self.period_tasks_pending.is_empty()
            && self.date_flex_pending.is_empty()
            && self.deadline_flexible_tasks.is_empty()
            && self.fully_flexible_tasks.is_empty()
            && self.out_of_scope.is_empty()
    }
}

/// Partitions tasks into placement buckets. Pure: equal input gives equal buckets.
pub struct TaskCategorizer {
    now: NaiveDateTime,
    scope_dates: Vec<NaiveDate>,
    allow_splitting: bool,
}

enum Slot {
    Fixed(NaiveDateTime),
    Period(NaiveDate),
    Date(NaiveDate),
}

impl TaskCategorizer {
    pub fn new(now: NaiveDateTime, scope_dates: &[NaiveDate], allow_splitting: bool) -> Self {
        Self {
            now,
            scope_dates: scope_dates.to_vec(),
            allow_splitting,
        }
    }

    pub fn categorize(&self, tasks: Vec<PlanningTask>) -> CategorizedTasks {
        let mut buckets = CategorizedTasks::default();
        let (Some(first), Some(last)) = (self.scope_dates.first(), self.scope_dates.last()) else {
            return buckets;
        };
        let (first, last) = (*first, *last);

        for mut planning_task in tasks {
            if planning_task.task.is_completed {
                continue;
            }

            if planning_task.task.is_recurring() {
                self.categorize_recurring(planning_task, first, last, &mut buckets);
                continue;
            }

            match planning_task.task.start_time_plan.as_ref().map(slot_for) {
                Some(slot) => {
                    if !self.scope_dates.contains(&slot_date(&slot)) {
                        debug!(
                            target: "planner::categorizer",
                            task_id = %planning_task.task.id,
                            "task pinned outside scope"
                        );
                        buckets.out_of_scope.push(planning_task.task);
                        continue;
                    }
                    if !matches!(slot, Slot::Fixed(_)) {
                        planning_task.splittable = self.can_split(&planning_task);
                    }
                    push_slot(&mut buckets, slot, planning_task);
                }
                None => {
                    planning_task.splittable = self.can_split(&planning_task);
                    if planning_task.task.end_time_plan.is_some() {
                        buckets.deadline_flexible_tasks.push(planning_task);
                    } else {
                        buckets.fully_flexible_tasks.push(planning_task);
                    }
                }
            }
        }

        debug!(
            target: "planner::categorizer",
            now = %self.now,
            fixed = buckets.fixed_occurrences.len(),
            period_dates = buckets.period_tasks_pending.len(),
            date_flex_dates = buckets.date_flex_pending.len(),
            deadline = buckets.deadline_flexible_tasks.len(),
            flexible = buckets.fully_flexible_tasks.len(),
            out_of_scope = buckets.out_of_scope.len(),
            "tasks categorized"
        );
        buckets
    }

    /// Anchor: start date, end date, creation date, then the first scope date.
    fn categorize_recurring(
        &self,
        mut planning_task: PlanningTask,
        first: NaiveDate,
        last: NaiveDate,
        buckets: &mut CategorizedTasks,
    ) {
        let task = &planning_task.task;
        let Some(plan) = task.recurrence.as_ref() else {
            return;
        };
        let anchor = task
            .start_time_plan
            .as_ref()
            .or(task.end_time_plan.as_ref())
            .map(|time_plan| time_plan.date)
            .or_else(|| task.created_at.map(|created| created.date()))
            .unwrap_or(first);
        let dates = RecurrenceExpander::dates_between(plan, anchor, first, last);
        if dates.is_empty() {
            debug!(
                target: "planner::categorizer",
                task_id = %task.id,
                "recurrence has no occurrence in scope"
            );
            return;
        }

        let template = task.start_time_plan.clone();
        if !matches!(template, Some(TimePlan { time: Some(_), .. })) {
            planning_task.splittable = self.can_split(&planning_task);
        }
        for date in dates {
            let slot = match &template {
                Some(TimePlan {
                    time: Some(time), ..
                }) => Slot::Fixed(date.and_time(*time)),
                Some(plan) if plan.day_period.is_set() => Slot::Period(date),
                _ => Slot::Date(date),
            };
            push_slot(buckets, slot, planning_task.clone());
        }
    }

    fn can_split(&self, planning_task: &PlanningTask) -> bool {
        self.allow_splitting && planning_task.remaining_minutes > 0
    }
}

fn slot_for(plan: &TimePlan) -> Slot {
    match plan.date_time() {
        Some(start) => Slot::Fixed(start),
        None if plan.day_period.is_set() => Slot::Period(plan.date),
        None => Slot::Date(plan.date),
    }
}

fn slot_date(slot: &Slot) -> NaiveDate {
    match slot {
        Slot::Fixed(start) => start.date(),
        Slot::Period(date) | Slot::Date(date) => *date,
    }
}

fn push_slot(buckets: &mut CategorizedTasks, slot: Slot, planning_task: PlanningTask) {
    match slot {
        Slot::Fixed(start) => buckets
            .fixed_occurrences
            .push(Occurrence::new(planning_task, start)),
        Slot::Period(date) => buckets
            .period_tasks_pending
            .entry(date)
            .or_default()
            .push(planning_task),
        Slot::Date(date) => buckets
            .date_flex_pending
            .entry(date)
            .or_default()
            .push(planning_task),
    }
}

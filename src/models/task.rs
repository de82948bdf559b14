use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::models::recurrence::RecurrencePlan;

/// Longest stretch a single task or tunable may cover: one leap year.
pub const MAX_TASK_MINUTES: i64 = 366 * 24 * 60;

/// Calendar years a time plan may fall in.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Priority {
    pub fn weight(self) -> f64 {
        match self {
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low => 1.0,
            Priority::None => 0.0,
        }
    }
}

/// Coarse part of the day a task is meant for when it has no exact time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayPeriod {
    Morning,
    Evening,
    Night,
    #[serde(rename = "ALLDAY")]
    AllDay,
    #[default]
    None,
}

impl DayPeriod {
    pub fn is_set(self) -> bool {
        self != DayPeriod::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePlan {
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub day_period: DayPeriod,
}

impl TimePlan {
    pub fn at(date_time: NaiveDateTime) -> Self {
        Self {
            date: date_time.date(),
            time: Some(date_time.time()),
            day_period: DayPeriod::None,
        }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            date,
            time: None,
            day_period: DayPeriod::None,
        }
    }

    pub fn in_period(date: NaiveDate, day_period: DayPeriod) -> Self {
        Self {
            date,
            time: None,
            day_period,
        }
    }

    pub fn date_time(&self) -> Option<NaiveDateTime> {
        self.time.map(|time| self.date.and_time(time))
    }

    /// Exact instant, or the end of the planned date when only a date is known.
    pub fn latest_instant(&self) -> NaiveDateTime {
        match self.date_time() {
            Some(exact) => exact,
            None => self.date.and_time(NaiveTime::MIN) + Duration::days(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub is_completed: bool,
}

/// Planning view of a user task. Never mutated by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub start_time_plan: Option<TimePlan>,
    #[serde(default)]
    pub end_time_plan: Option<TimePlan>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub recurrence: Option<RecurrencePlan>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: Priority::None,
            start_time_plan: None,
            end_time_plan: None,
            duration_minutes: None,
            recurrence: None,
            is_completed: false,
            subtasks: Vec::new(),
            created_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_start(mut self, plan: TimePlan) -> Self {
        self.start_time_plan = Some(plan);
        self
    }

    pub fn with_end(mut self, plan: TimePlan) -> Self {
        self.end_time_plan = Some(plan);
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_recurrence(mut self, plan: RecurrencePlan) -> Self {
        self.recurrence = Some(plan);
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence
            .as_ref()
            .map(RecurrencePlan::is_repeating)
            .unwrap_or(false)
    }

    pub fn deadline(&self) -> Option<NaiveDateTime> {
        self.end_time_plan.as_ref().map(TimePlan::latest_instant)
    }

    /// Minutes the task needs on the timeline.
    ///
    /// Order: explicit duration, exact start/end span, open subtask estimates,
    /// then `default_minutes`.
    pub fn effective_duration_minutes(&self, default_minutes: i64) -> i64 {
        if let Some(minutes) = self.duration_minutes {
            return minutes.max(0);
        }

        let exact_span = self
            .start_time_plan
            .as_ref()
            .and_then(TimePlan::date_time)
            .zip(self.end_time_plan.as_ref().and_then(TimePlan::date_time));
        if let Some((start, end)) = exact_span {
            return (end - start).num_minutes().max(0);
        }

        let subtask_minutes: i64 = self
            .subtasks
            .iter()
            .filter(|subtask| !subtask.is_completed)
            .filter_map(|subtask| subtask.estimated_minutes)
            .filter(|minutes| *minutes > 0)
            .sum();
        if subtask_minutes > 0 {
            return subtask_minutes;
        }

        default_minutes
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.id.trim().is_empty() {
            return Err(PlannerError::configuration("task id cannot be empty"));
        }

        let start = self.start_time_plan.as_ref().and_then(TimePlan::date_time);
        let end = self.end_time_plan.as_ref().and_then(TimePlan::date_time);
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(PlannerError::configuration(format!(
                    "task {} starts at {start} after its end {end}",
                    self.id
                )));
            }
        }

        for plan in self.start_time_plan.iter().chain(self.end_time_plan.iter()) {
            if !SUPPORTED_YEARS.contains(&plan.date.year()) {
                return Err(PlannerError::configuration(format!(
                    "task {} is planned on {} outside years {}..={}",
                    self.id,
                    plan.date,
                    SUPPORTED_YEARS.start(),
                    SUPPORTED_YEARS.end()
                )));
            }
        }

        if let Some(minutes) = self.duration_minutes {
            if !(0..=MAX_TASK_MINUTES).contains(&minutes) {
                return Err(PlannerError::configuration(format!(
                    "task {} duration must be between 0 and {MAX_TASK_MINUTES} minutes",
                    self.id
                )));
            }
        }

        let mut estimated: i64 = 0;
        for minutes in self.subtasks.iter().filter_map(|subtask| subtask.estimated_minutes) {
            if !(0..=MAX_TASK_MINUTES).contains(&minutes) {
                return Err(PlannerError::configuration(format!(
                    "task {} has a subtask estimate outside 0..={MAX_TASK_MINUTES} minutes",
                    self.id
                )));
            }
            estimated += minutes;
        }
        if estimated > MAX_TASK_MINUTES {
            return Err(PlannerError::configuration(format!(
                "task {} subtask estimates add up to more than {MAX_TASK_MINUTES} minutes",
                self.id
            )));
        }

        if let Some(plan) = &self.recurrence {
            plan.validate()?;
        }

        Ok(())
    }
}

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::models::settings::{DayPeriodBounds, PlannerSettings, WorkHours, MINUTES_PER_DAY};
use crate::models::task::{Task, MAX_TASK_MINUTES, SUPPORTED_YEARS};

/// Half-open `[start, end)` range on the local timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| TimeInterval::new(start, end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleScope {
    #[default]
    Today,
    Tomorrow,
    ThisWeek,
}

impl ScheduleScope {
    /// Dates covered by the scope, in order. THIS_WEEK runs through Sunday.
    pub fn dates(self, today: NaiveDate) -> Vec<NaiveDate> {
        match self {
            ScheduleScope::Today => vec![today],
            ScheduleScope::Tomorrow => vec![today + Duration::days(1)],
            ScheduleScope::ThisWeek => {
                let remaining = 6 - today.weekday().num_days_from_monday() as i64;
                (0..=remaining)
                    .map(|offset| today + Duration::days(offset))
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrioritizationStrategy {
    #[default]
    UrgentFirst,
    HighPriorityFirst,
    ShortTasksFirst,
    EarlierDeadlinesFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOrganization {
    #[default]
    MaximizeProductivity,
    FocusUrgentBuffer,
    LooseScheduleBreaks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverdueTaskHandling {
    AddTodayFreeTime,
    #[default]
    ManageWhenFree,
    PostponeToTomorrow,
}

/// User choice for a conflict or expired task; applied to the task before the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionOption {
    MoveToNearestFree,
    MoveToTomorrow,
    ManuallySchedule { at: NaiveDateTime },
    LeaveItLikeThat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOrigin {
    Regular,
    Overdue(OverdueTaskHandling),
}

/// Per-run scratch wrapper around a task.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningTask {
    pub task: Task,
    pub remaining_minutes: i64,
    /// Set by the categorizer for flexible tasks when splitting is allowed.
    pub splittable: bool,
    pub origin: TaskOrigin,
}

impl PlanningTask {
    pub fn new(task: Task, default_minutes: i64) -> Self {
        let remaining_minutes = task.effective_duration_minutes(default_minutes);
        Self {
            task,
            remaining_minutes,
            splittable: false,
            origin: TaskOrigin::Regular,
        }
    }

    pub fn with_origin(mut self, origin: TaskOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self.origin, TaskOrigin::Overdue(_))
    }
}

/// One concrete fixed-time instance of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub planning_task: PlanningTask,
    pub start: NaiveDateTime,
}

impl Occurrence {
    pub fn new(planning_task: PlanningTask, start: NaiveDateTime) -> Self {
        Self {
            planning_task,
            start,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.planning_task.remaining_minutes)
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end())
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPart {
    /// 1-based.
    pub index: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTaskItem {
    pub task: Task,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub date: NaiveDate,
    #[serde(default)]
    pub split_part: Option<SplitPart>,
}

impl ScheduledTaskItem {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    FixedVsFixed,
    NoSlotInScope,
    /// A placement aborted on an internal invariant violation.
    PlacementFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictItem {
    pub tasks: Vec<Task>,
    pub reason: String,
    #[serde(default)]
    pub contested_time: Option<TimeInterval>,
    pub conflict_type: ConflictType,
}

impl ConflictItem {
    pub fn involves(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredTaskItem {
    pub task: Task,
    pub policy: OverdueTaskHandling,
    pub reason: String,
}

/// Knobs the placer reads besides the user-facing preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementTuning {
    pub default_task_minutes: i64,
    pub urgent_buffer_minutes: i64,
    pub break_minutes: i64,
    pub min_split_minutes: i64,
    pub urgent_horizon_hours: i64,
}

impl PlacementTuning {
    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self {
            default_task_minutes: settings.default_task_minutes,
            urgent_buffer_minutes: settings.urgent_buffer_minutes,
            break_minutes: settings.break_minutes,
            min_split_minutes: settings.min_split_minutes,
            urgent_horizon_hours: settings.urgent_horizon_hours,
        }
    }

    pub fn validate(&self) -> PlannerResult<()> {
        let fields = [
            ("defaultTaskMinutes", self.default_task_minutes, MAX_TASK_MINUTES),
            ("urgentBufferMinutes", self.urgent_buffer_minutes, MAX_TASK_MINUTES),
            ("breakMinutes", self.break_minutes, MAX_TASK_MINUTES),
            ("minSplitMinutes", self.min_split_minutes, MAX_TASK_MINUTES),
            ("urgentHorizonHours", self.urgent_horizon_hours, MAX_TASK_MINUTES / 60),
        ];
        for (name, value, limit) in fields {
            if value < 0 {
                return Err(PlannerError::configuration(format!(
                    "{name} must not be negative"
                )));
            }
            if value > limit {
                return Err(PlannerError::configuration(format!(
                    "{name} must be at most {limit}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PlacementTuning {
    fn default() -> Self {
        Self::from_settings(&PlannerSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerInput {
    pub tasks: Vec<Task>,
    pub now: NaiveDateTime,
    pub work_hours: WorkHours,
    pub day_periods: DayPeriodBounds,
    pub schedule_scope: ScheduleScope,
    pub prioritization_strategy: PrioritizationStrategy,
    pub day_organization: DayOrganization,
    pub overdue_task_handling: OverdueTaskHandling,
    pub allow_splitting: bool,
    pub tuning: PlacementTuning,
}

impl PlannerInput {
    pub fn new(tasks: Vec<Task>, now: NaiveDateTime) -> Self {
        Self::from_settings(tasks, now, &PlannerSettings::default())
    }

    pub fn from_settings(tasks: Vec<Task>, now: NaiveDateTime, settings: &PlannerSettings) -> Self {
        Self {
            tasks,
            now,
            work_hours: settings.work_hours,
            day_periods: settings.day_periods,
            schedule_scope: settings.schedule_scope,
            prioritization_strategy: settings.prioritization_strategy,
            day_organization: settings.day_organization,
            overdue_task_handling: settings.overdue_task_handling,
            allow_splitting: settings.allow_splitting,
            tuning: PlacementTuning::from_settings(settings),
        }
    }

    pub fn with_work_hours(mut self, work_hours: WorkHours) -> Self {
        self.work_hours = work_hours;
        self
    }

    pub fn with_scope(mut self, scope: ScheduleScope) -> Self {
        self.schedule_scope = scope;
        self
    }

    pub fn with_strategy(mut self, strategy: PrioritizationStrategy) -> Self {
        self.prioritization_strategy = strategy;
        self
    }

    pub fn with_day_organization(mut self, organization: DayOrganization) -> Self {
        self.day_organization = organization;
        self
    }

    pub fn with_overdue_handling(mut self, handling: OverdueTaskHandling) -> Self {
        self.overdue_task_handling = handling;
        self
    }

    pub fn with_splitting(mut self, allow: bool) -> Self {
        self.allow_splitting = allow;
        self
    }

    pub fn with_tuning(mut self, tuning: PlacementTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    pub fn scope_dates(&self) -> Vec<NaiveDate> {
        self.schedule_scope.dates(self.today())
    }

    /// Fails fast on malformed input; nothing is planned when this errors.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.work_hours.start_minute >= MINUTES_PER_DAY
            || self.work_hours.end_minute >= MINUTES_PER_DAY
        {
            return Err(PlannerError::configuration(
                "work hours must be given in minutes before 24:00",
            ));
        }
        if !SUPPORTED_YEARS.contains(&self.now.year()) {
            return Err(PlannerError::configuration(format!(
                "planning instant {} is outside the supported calendar",
                self.now
            )));
        }
        crate::services::settings_service::validate_day_periods(&self.day_periods)?;
        self.tuning.validate()?;

        let mut seen = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !seen.insert(task.id.as_str()) {
                return Err(PlannerError::configuration(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
        }
        Ok(())
    }
}

/// Mutable per-run aggregate. Created by the orchestrator, consumed into the output.
#[derive(Debug, Default)]
pub struct PlanningContext {
    pub scheduled: BTreeMap<NaiveDate, Vec<ScheduledTaskItem>>,
    pub conflicts: Vec<ConflictItem>,
    pub unresolved_expired: Vec<ExpiredTaskItem>,
    pub out_of_scope: Vec<Task>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scheduled(&mut self, item: ScheduledTaskItem) {
        self.scheduled.entry(item.date).or_default().push(item);
    }

    pub fn add_conflict(&mut self, conflict: ConflictItem) {
        self.conflicts.push(conflict);
    }

    pub fn add_expired(&mut self, item: ExpiredTaskItem) {
        self.unresolved_expired.push(item);
    }

    pub fn add_out_of_scope(&mut self, task: Task) {
        self.out_of_scope.push(task);
    }

    pub fn into_output(self, session_id: String, generated_at: NaiveDateTime) -> PlannerOutput {
        let mut scheduled = self.scheduled;
        for items in scheduled.values_mut() {
            items.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        }
        PlannerOutput {
            session_id,
            generated_at,
            scheduled,
            unresolved_expired: self.unresolved_expired,
            unresolved_conflicts: self.conflicts,
            out_of_scope: self.out_of_scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub scheduled_items: usize,
    pub scheduled_tasks: usize,
    pub conflicts: usize,
    pub unresolved_expired: usize,
    pub out_of_scope: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerOutput {
    pub session_id: String,
    pub generated_at: NaiveDateTime,
    pub scheduled: BTreeMap<NaiveDate, Vec<ScheduledTaskItem>>,
    pub unresolved_expired: Vec<ExpiredTaskItem>,
    pub unresolved_conflicts: Vec<ConflictItem>,
    pub out_of_scope: Vec<Task>,
}

impl PlannerOutput {
    pub fn items(&self) -> impl Iterator<Item = &ScheduledTaskItem> {
        self.scheduled.values().flatten()
    }

    pub fn items_for(&self, task_id: &str) -> Vec<&ScheduledTaskItem> {
        self.items().filter(|item| item.task.id == task_id).collect()
    }

    pub fn is_scheduled(&self, task_id: &str) -> bool {
        self.items().any(|item| item.task.id == task_id)
    }

    pub fn scheduled_minutes(&self, task_id: &str) -> i64 {
        self.items()
            .filter(|item| item.task.id == task_id)
            .map(ScheduledTaskItem::duration_minutes)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
            && self.unresolved_expired.is_empty()
            && self.unresolved_conflicts.is_empty()
            && self.out_of_scope.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        let scheduled_tasks: HashSet<&str> =
            self.items().map(|item| item.task.id.as_str()).collect();
        PlanSummary {
            scheduled_items: self.items().count(),
            scheduled_tasks: scheduled_tasks.len(),
            conflicts: self.unresolved_conflicts.len(),
            unresolved_expired: self.unresolved_expired.len(),
            out_of_scope: self.out_of_scope.len(),
        }
    }
}

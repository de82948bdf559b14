use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::planning::{
    DayOrganization, OverdueTaskHandling, PrioritizationStrategy, ScheduleScope, TimeInterval,
};
use crate::models::task::DayPeriod;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Daily working window in minutes from midnight. `end < start` wraps past
/// midnight; `end == start` is a full day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHours {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl WorkHours {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn from_times(start: NaiveTime, end: NaiveTime) -> Self {
        Self::new(
            crate::services::schedule_utils::minutes_from_midnight(start) as u32,
            crate::services::schedule_utils::minutes_from_midnight(end) as u32,
        )
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end_minute <= self.start_minute
    }

    pub fn duration_minutes(&self) -> i64 {
        if self.wraps_midnight() {
            (MINUTES_PER_DAY - self.start_minute + self.end_minute) as i64
        } else {
            (self.end_minute - self.start_minute) as i64
        }
    }

    pub fn span_for(&self, date: NaiveDate) -> TimeInterval {
        let start = date.and_time(NaiveTime::MIN) + Duration::minutes(self.start_minute as i64);
        TimeInterval::new(start, start + Duration::minutes(self.duration_minutes()))
    }
}

impl Default for WorkHours {
    fn default() -> Self {
        Self::new(9 * 60, 18 * 60)
    }
}

/// Bounds in minutes from the date's midnight; `end_minute` may reach into the
/// next day (up to 2880).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRange {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl PeriodRange {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn interval_on(&self, date: NaiveDate) -> TimeInterval {
        let midnight = date.and_time(NaiveTime::MIN);
        TimeInterval::new(
            midnight + Duration::minutes(self.start_minute as i64),
            midnight + Duration::minutes(self.end_minute as i64),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPeriodBounds {
    pub morning: PeriodRange,
    pub evening: PeriodRange,
    pub night: PeriodRange,
}

impl DayPeriodBounds {
    /// `None` for ALLDAY / NONE: the whole working span applies.
    pub fn range_for(&self, period: DayPeriod) -> Option<PeriodRange> {
        match period {
            DayPeriod::Morning => Some(self.morning),
            DayPeriod::Evening => Some(self.evening),
            DayPeriod::Night => Some(self.night),
            DayPeriod::AllDay | DayPeriod::None => None,
        }
    }
}

impl Default for DayPeriodBounds {
    fn default() -> Self {
        Self {
            morning: PeriodRange::new(6 * 60, 12 * 60),
            evening: PeriodRange::new(12 * 60, 18 * 60),
            night: PeriodRange::new(18 * 60, 30 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    pub work_hours: WorkHours,
    pub day_periods: DayPeriodBounds,
    pub default_task_minutes: i64,
    pub urgent_buffer_minutes: i64,
    pub break_minutes: i64,
    pub min_split_minutes: i64,
    pub urgent_horizon_hours: i64,
    pub schedule_scope: ScheduleScope,
    pub prioritization_strategy: PrioritizationStrategy,
    pub day_organization: DayOrganization,
    pub overdue_task_handling: OverdueTaskHandling,
    pub allow_splitting: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            work_hours: WorkHours::default(),
            day_periods: DayPeriodBounds::default(),
            default_task_minutes: 30,
            urgent_buffer_minutes: 15,
            break_minutes: 10,
            min_split_minutes: 15,
            urgent_horizon_hours: 24,
            schedule_scope: ScheduleScope::Today,
            prioritization_strategy: PrioritizationStrategy::UrgentFirst,
            day_organization: DayOrganization::MaximizeProductivity,
            overdue_task_handling: OverdueTaskHandling::ManageWhenFree,
            allow_splitting: false,
        }
    }
}

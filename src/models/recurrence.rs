use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceFrequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Cadence taken from `interval_unit`.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntervalUnit {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

/// Resolved period a rule repeats over once CUSTOM is unfolded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// "2nd Tuesday" style selector. Ordinal 0 means every such weekday in the period,
/// negative ordinals count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdinalWeekday {
    pub ordinal: i8,
    pub weekday: Weekday,
}

impl OrdinalWeekday {
    pub fn new(ordinal: i8, weekday: Weekday) -> Self {
        Self { ordinal, weekday }
    }
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePlan {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
    #[serde(default)]
    pub selected_days: Vec<Weekday>,
    /// 1..=31 from the start of the month, -31..=-1 from its end.
    #[serde(default)]
    pub days_of_month: Vec<i8>,
    #[serde(default)]
    pub months_of_year: Vec<u32>,
    #[serde(default)]
    pub ordinals_of_weekdays: Vec<OrdinalWeekday>,
    #[serde(default)]
    pub set_pos: Vec<i32>,
    #[serde(default)]
    pub repeat_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub repeat_occurrences: Option<u32>,
}

impl RecurrencePlan {
    pub fn new(frequency: RecurrenceFrequency) -> Self {
        let interval_unit = match frequency {
            RecurrenceFrequency::Weekly => IntervalUnit::Week,
            RecurrenceFrequency::Monthly => IntervalUnit::Month,
            RecurrenceFrequency::Yearly => IntervalUnit::Year,
            _ => IntervalUnit::Day,
        };
        Self {
            frequency,
            interval: 1,
            interval_unit,
            selected_days: Vec::new(),
            days_of_month: Vec::new(),
            months_of_year: Vec::new(),
            ordinals_of_weekdays: Vec::new(),
            set_pos: Vec::new(),
            repeat_end_date: None,
            repeat_occurrences: None,
        }
    }

    pub fn custom(interval: u32, unit: IntervalUnit) -> PlannerResult<Self> {
        let mut plan = Self::new(RecurrenceFrequency::Custom).with_interval(interval)?;
        plan.interval_unit = unit;
        Ok(plan)
    }

    pub fn with_interval(mut self, interval: u32) -> PlannerResult<Self> {
        ensure_interval(interval)?;
        self.interval = interval;
        Ok(self)
    }

    pub fn with_selected_days(mut self, days: Vec<Weekday>) -> Self {
        self.selected_days = days;
        self
    }

    pub fn with_days_of_month(mut self, days: Vec<i8>) -> PlannerResult<Self> {
        ensure_days_of_month(&days)?;
        self.days_of_month = days;
        Ok(self)
    }

    pub fn with_months_of_year(mut self, months: Vec<u32>) -> PlannerResult<Self> {
        ensure_months(&months)?;
        self.months_of_year = months;
        Ok(self)
    }

    pub fn with_ordinal_weekdays(mut self, entries: Vec<OrdinalWeekday>) -> PlannerResult<Self> {
        ensure_ordinals(&entries)?;
        self.ordinals_of_weekdays = entries;
        Ok(self)
    }

    pub fn with_set_pos(mut self, positions: Vec<i32>) -> PlannerResult<Self> {
        ensure_set_pos(&positions)?;
        self.set_pos = positions;
        Ok(self)
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> PlannerResult<Self> {
        if self.repeat_occurrences.is_some() {
            return Err(PlannerError::configuration(
                "recurrence cannot end both on a date and after a number of occurrences",
            ));
        }
        self.repeat_end_date = Some(end);
        Ok(self)
    }

    pub fn with_occurrences(mut self, count: u32) -> PlannerResult<Self> {
        if self.repeat_end_date.is_some() {
            return Err(PlannerError::configuration(
                "recurrence cannot end both on a date and after a number of occurrences",
            ));
        }
        ensure_occurrences(count)?;
        self.repeat_occurrences = Some(count);
        Ok(self)
    }

    pub fn is_repeating(&self) -> bool {
        self.frequency != RecurrenceFrequency::None
    }

    pub fn cadence(&self) -> Option<Cadence> {
        match self.frequency {
            RecurrenceFrequency::None => None,
            RecurrenceFrequency::Daily => Some(Cadence::Daily),
            RecurrenceFrequency::Weekly => Some(Cadence::Weekly),
            RecurrenceFrequency::Monthly => Some(Cadence::Monthly),
            RecurrenceFrequency::Yearly => Some(Cadence::Yearly),
            RecurrenceFrequency::Custom => Some(match self.interval_unit {
                IntervalUnit::Day => Cadence::Daily,
                IntervalUnit::Week => Cadence::Weekly,
                IntervalUnit::Month => Cadence::Monthly,
                IntervalUnit::Year => Cadence::Yearly,
            }),
        }
    }

    /// Re-checks everything the builder enforces; deserialized plans bypass the builder.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.repeat_end_date.is_some() && self.repeat_occurrences.is_some() {
            return Err(PlannerError::configuration(
                "recurrence cannot end both on a date and after a number of occurrences",
            ));
        }
        ensure_interval(self.interval)?;
        if let Some(count) = self.repeat_occurrences {
            ensure_occurrences(count)?;
        }
        ensure_days_of_month(&self.days_of_month)?;
        ensure_months(&self.months_of_year)?;
        ensure_ordinals(&self.ordinals_of_weekdays)?;
        ensure_set_pos(&self.set_pos)?;
        Ok(())
    }
}

fn ensure_interval(interval: u32) -> PlannerResult<()> {
    if interval == 0 {
        return Err(PlannerError::configuration(
            "recurrence interval must be positive",
        ));
    }
    if interval > 999 {
        return Err(PlannerError::configuration(
            "recurrence interval must be less than 1000",
        ));
    }
    Ok(())
}

fn ensure_occurrences(count: u32) -> PlannerResult<()> {
    if count == 0 {
        return Err(PlannerError::configuration(
            "recurrence occurrence count must be positive",
        ));
    }
    if count > 9999 {
        return Err(PlannerError::configuration(
            "recurrence occurrence count must be less than 10000",
        ));
    }
    Ok(())
}

fn ensure_days_of_month(days: &[i8]) -> PlannerResult<()> {
    if days.iter().any(|day| *day == 0 || !(-31..=31).contains(day)) {
        return Err(PlannerError::configuration(
            "days of month must be between -31 and 31, excluding 0",
        ));
    }
    Ok(())
}

fn ensure_months(months: &[u32]) -> PlannerResult<()> {
    if months.iter().any(|month| !(1..=12).contains(month)) {
        return Err(PlannerError::configuration(
            "months of year must be between 1 and 12",
        ));
    }
    Ok(())
}

fn ensure_ordinals(entries: &[OrdinalWeekday]) -> PlannerResult<()> {
    if entries.iter().any(|entry| !(-5..=5).contains(&entry.ordinal)) {
        return Err(PlannerError::configuration(
            "weekday ordinals must be between -5 and 5",
        ));
    }
    Ok(())
}

fn ensure_set_pos(positions: &[i32]) -> PlannerResult<()> {
    if positions
        .iter()
        .any(|position| *position == 0 || !(-366..=366).contains(position))
    {
        return Err(PlannerError::configuration(
            "set positions must be between -366 and 366, excluding 0",
        ));
    }
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{PlannerError, PlannerResult};
use crate::models::planning::{
    DayOrganization, OverdueTaskHandling, PlacementTuning, PrioritizationStrategy, ScheduleScope,
};
use crate::models::settings::{DayPeriodBounds, PeriodRange, PlannerSettings, MINUTES_PER_DAY};

const MAX_PERIOD_MINUTE: u32 = 2 * MINUTES_PER_DAY;

/// Partial update; `None` leaves the current value in place.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettingsUpdate {
    pub work_start_minute: Option<u32>,
    pub work_end_minute: Option<u32>,
    pub day_periods: Option<DayPeriodBounds>,
    pub default_task_minutes: Option<i64>,
    pub urgent_buffer_minutes: Option<i64>,
    pub break_minutes: Option<i64>,
    pub min_split_minutes: Option<i64>,
    pub urgent_horizon_hours: Option<i64>,
    pub schedule_scope: Option<ScheduleScope>,
    pub prioritization_strategy: Option<PrioritizationStrategy>,
    pub day_organization: Option<DayOrganization>,
    pub overdue_task_handling: Option<OverdueTaskHandling>,
    pub allow_splitting: Option<bool>,
}

pub fn parse_settings(raw: &str) -> PlannerResult<PlannerSettings> {
    let settings: PlannerSettings = serde_json::from_str(raw).map_err(|err| {
        PlannerError::validation_with_details(
            "settings document is not valid",
            json!({ "error": err.to_string() }),
        )
    })?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Missing file means defaults.
pub fn load_settings(path: &Path) -> PlannerResult<PlannerSettings> {
    if !path.exists() {
        debug!(target: "planner::settings", path = %path.display(), "no settings file, using defaults");
        return Ok(PlannerSettings::default());
    }
    let raw = fs::read_to_string(path)?;
    parse_settings(&raw)
}

pub fn save_settings(path: &Path, settings: &PlannerSettings) -> PlannerResult<()> {
    validate_settings(settings)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(settings)?;
    fs::write(path, body)?;
    debug!(target: "planner::settings", path = %path.display(), "settings saved");
    Ok(())
}

pub fn validate_settings(settings: &PlannerSettings) -> PlannerResult<()> {
    ensure_valid_minute(settings.work_hours.start_minute)?;
    ensure_valid_minute(settings.work_hours.end_minute)?;
    validate_day_periods(&settings.day_periods)?;

    PlacementTuning::from_settings(settings).validate()?;
    Ok(())
}

pub fn validate_day_periods(periods: &DayPeriodBounds) -> PlannerResult<()> {
    for (name, range) in [
        ("morning", periods.morning),
        ("evening", periods.evening),
        ("night", periods.night),
    ] {
        ensure_valid_range(name, range)?;
    }
    Ok(())
}

pub fn apply_update(
    mut settings: PlannerSettings,
    update: PlannerSettingsUpdate,
) -> PlannerResult<PlannerSettings> {
    if let Some(start) = update.work_start_minute {
        ensure_valid_minute(start)?;
        settings.work_hours.start_minute = start;
    }
    if let Some(end) = update.work_end_minute {
        ensure_valid_minute(end)?;
        settings.work_hours.end_minute = end;
    }
    if let Some(periods) = update.day_periods {
        settings.day_periods = periods;
    }
    if let Some(value) = update.default_task_minutes {
        settings.default_task_minutes = value;
    }
    if let Some(value) = update.urgent_buffer_minutes {
        settings.urgent_buffer_minutes = value;
    }
    if let Some(value) = update.break_minutes {
        settings.break_minutes = value;
    }
    if let Some(value) = update.min_split_minutes {
        settings.min_split_minutes = value;
    }
    if let Some(value) = update.urgent_horizon_hours {
        settings.urgent_horizon_hours = value;
    }
    if let Some(scope) = update.schedule_scope {
        settings.schedule_scope = scope;
    }
    if let Some(strategy) = update.prioritization_strategy {
        settings.prioritization_strategy = strategy;
    }
    if let Some(organization) = update.day_organization {
        settings.day_organization = organization;
    }
    if let Some(handling) = update.overdue_task_handling {
        settings.overdue_task_handling = handling;
    }
    if let Some(allow) = update.allow_splitting {
        settings.allow_splitting = allow;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

/// File-backed settings with an in-memory copy.
pub struct SettingsService {
    path: PathBuf,
    cache: RwLock<Option<PlannerSettings>>,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> PlannerResult<PlannerSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = load_settings(&self.path)?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, update: PlannerSettingsUpdate) -> PlannerResult<PlannerSettings> {
        let updated = apply_update(self.get()?, update)?;
        save_settings(&self.path, &updated)?;
        match self.cache.write() {
            Ok(mut guard) => *guard = Some(updated.clone()),
            Err(_) => {
                warn!(target: "planner::settings", "settings cache lock poisoned; next read reloads from disk")
            }
        }
        Ok(updated)
    }
}

fn ensure_valid_minute(value: u32) -> PlannerResult<()> {
    if value >= MINUTES_PER_DAY {
        return Err(PlannerError::configuration(format!(
            "work hour minute {value} must be below {MINUTES_PER_DAY}"
        )));
    }
    Ok(())
}

fn ensure_valid_range(name: &str, range: PeriodRange) -> PlannerResult<()> {
    if range.end_minute > MAX_PERIOD_MINUTE || range.start_minute >= range.end_minute {
        return Err(PlannerError::configuration(format!(
            "{name} period must satisfy start < end <= {MAX_PERIOD_MINUTE}"
        )));
    }
    Ok(())
}

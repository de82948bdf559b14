//! Automatic day/week planner: expands recurring tasks, places fixed and
//! flexible work on a timeline without double-booking, and reports what could
//! not be placed.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{PlannerError, PlannerResult};
pub use models::planning::{
    ConflictItem, ConflictType, DayOrganization, ExpiredTaskItem, OverdueTaskHandling,
    PlacementTuning, PlanSummary, PlannerInput, PlannerOutput, PrioritizationStrategy,
    ResolutionOption, ScheduleScope, ScheduledTaskItem, SplitPart, TimeInterval,
};
pub use models::recurrence::{IntervalUnit, OrdinalWeekday, RecurrenceFrequency, RecurrencePlan};
pub use models::settings::{DayPeriodBounds, PeriodRange, PlannerSettings, WorkHours};
pub use models::task::{DayPeriod, Priority, Subtask, Task, TimePlan, MAX_TASK_MINUTES};
pub use services::planning_service::GeneratePlanUseCase;
pub use services::recurrence_expander::RecurrenceExpander;

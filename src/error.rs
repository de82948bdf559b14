use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("interval {start} - {end} is not free on {date}")]
    IntervalNotFree {
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("internal invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PlannerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "planner::validation", %message, "configuration error");
        PlannerError::Configuration { message }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "planner::validation", %message, "validation error");
        PlannerError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "planner::validation", %message, details = %details, "validation error with details");
        PlannerError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn interval_not_free(date: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        warn!(target: "planner::timeline", %date, %start, %end, "reservation outside free time");
        PlannerError::IntervalNotFree { date, start, end }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "planner::invariant", %message, "invariant violation");
        PlannerError::InvariantViolation { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "planner::other", %message, "other error");
        PlannerError::Other(message)
    }

    /// Programming-error conditions that abort a single placement, never a run.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            PlannerError::IntervalNotFree { .. } | PlannerError::InvariantViolation { .. }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PlannerError::Configuration { .. } | PlannerError::Validation { .. }
        )
    }
}

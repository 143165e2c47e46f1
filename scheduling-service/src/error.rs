use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Resource {resource_id} is already booked by {conflicting_reference} on an overlapping slot")]
    Conflict {
        resource_id: Uuid,
        conflicting_booking_id: Uuid,
        conflicting_reference: String,
    },

    #[error("Illegal transition: cannot {action} from state {from}")]
    IllegalTransition { action: String, from: String },

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SchedulingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn illegal_transition(action: impl Into<String>, from: impl std::fmt::Display) -> Self {
        Self::IllegalTransition {
            action: action.into(),
            from: from.to_string(),
        }
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashdeskError {
    #[error("Statement {reference} is closed; only writes reaching the paid state are accepted")]
    LockedPeriod { reference: String },

    #[error("Illegal transition: cannot {action} from state {from}")]
    IllegalTransition { action: String, from: String },

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Catalog(#[from] clinic_core::CoreError),
}

impl CashdeskError {
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

pub type CashdeskResult<T> = Result<T, CashdeskError>;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Acting user for a mutating call
///
/// Passed explicitly on every write so attribution never relies on ambient
/// global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub display_name: String,
}

impl SessionContext {
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    /// Fixed context for automated/system writes
    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            display_name: "system".to_string(),
        }
    }
}

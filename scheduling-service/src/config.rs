use crate::models::BookingKind;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Scheduling defaults
///
/// A booking created without an explicit end gets `start + default duration`
/// for its kind, so point-in-time entries still take part in overlap checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub appointment_minutes: i64,
    pub consultation_minutes: i64,
    pub operation_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            appointment_minutes: 30,
            consultation_minutes: 30,
            operation_minutes: 60,
        }
    }
}

impl SchedulingConfig {
    pub fn default_duration(&self, kind: BookingKind) -> Duration {
        let minutes = match kind {
            BookingKind::Appointment => self.appointment_minutes,
            BookingKind::Consultation => self.consultation_minutes,
            BookingKind::Operation => self.operation_minutes,
        };
        Duration::minutes(minutes)
    }
}

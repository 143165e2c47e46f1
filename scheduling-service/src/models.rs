use crate::error::{SchedulingError, SchedulingResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contended, exclusively-allocatable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ConsultationRoom,
    Doctor,
    Bed,
    OperatingRoom,
}

/// A bookable clinic resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: ResourceKind,
    pub service_id: Option<Uuid>,
}

impl Resource {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            kind,
            service_id: None,
        }
    }

    pub fn in_service(mut self, service_id: Uuid) -> Self {
        self.service_id = Some(service_id);
        self
    }
}

/// The three booking surfaces share one entity, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Appointment,
    Consultation,
    Operation,
}

impl BookingKind {
    pub fn document_kind(&self) -> clinic_core::DocumentKind {
        match self {
            BookingKind::Appointment => clinic_core::DocumentKind::Appointment,
            BookingKind::Consultation => clinic_core::DocumentKind::Consultation,
            BookingKind::Operation => clinic_core::DocumentKind::Operation,
        }
    }
}

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    Draft,
    Confirmed,
    InProgress,
    Done,
    Cancelled,
}

impl BookingState {
    /// Terminal states accept no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Done | BookingState::Cancelled)
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookingState::Draft => "draft",
            BookingState::Confirmed => "confirmed",
            BookingState::InProgress => "in_progress",
            BookingState::Done => "done",
            BookingState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Lifecycle action requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Confirm,
    Start,
    Finish,
    Cancel,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Start => "start",
            BookingAction::Finish => "finish",
            BookingAction::Cancel => "cancel",
        }
    }
}

/// Half-open time interval: touching endpoints do not overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SchedulingResult<Self> {
        if end <= start {
            return Err(SchedulingError::validation(
                "end",
                "slot end must be after its start",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// Half-open overlap test
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// A reservation of one or two resources for a time interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub kind: BookingKind,
    pub patient_id: Uuid,
    pub resource_ids: Vec<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: BookingState,
    pub urgent: bool,
    /// Complaint for a consultation, operative report for an operation
    pub reason: Option<String>,
    /// Downstream booking completed together with this one
    pub follow_up_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Active bookings hold their slot against new reservations
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn binds(&self, resource_id: Uuid) -> bool {
        self.resource_ids.contains(&resource_id)
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            start: self.start,
            end: self.end,
        }
    }
}

/// Reservation request for [`crate::coordinator::BookingCoordinator::reserve`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub kind: BookingKind,
    pub patient_id: Uuid,
    pub resource_ids: Vec<Uuid>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub urgent: bool,
    pub note: Option<String>,
}

impl BookingRequest {
    pub fn new(kind: BookingKind, patient_id: Uuid, start: DateTime<Utc>) -> Self {
        Self {
            kind,
            patient_id,
            resource_ids: Vec::new(),
            start,
            end: None,
            urgent: false,
            note: None,
        }
    }

    pub fn on_resource(mut self, resource_id: Uuid) -> Self {
        self.resource_ids.push(resource_id);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Bed occupancy state, independent of time-interval booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedState {
    Free,
    Occupied,
    Maintenance,
}

impl std::fmt::Display for BedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BedState::Free => "free",
            BedState::Occupied => "occupied",
            BedState::Maintenance => "maintenance",
        };
        f.write_str(label)
    }
}

/// A bed inside a functional service unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub code: String,
    pub service_id: Uuid,
    pub state: BedState,
}

/// A patient's use of a bed, open until discharged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedOccupation {
    pub id: Uuid,
    pub bed_id: Uuid,
    pub patient_id: Uuid,
    pub admission_id: Uuid,
    pub entered_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl BedOccupation {
    /// Stay length in whole days, both boundary days counted, never negative
    pub fn stay_days(&self, as_of: DateTime<Utc>) -> i64 {
        let until = self.left_at.unwrap_or(as_of);
        let days = (until.date_naive() - self.entered_at.date_naive()).num_days() + 1;
        days.max(0)
    }
}

/// Admission lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionState {
    PreAdmit,
    Admitted,
    Discharged,
}

impl std::fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AdmissionState::PreAdmit => "pre_admit",
            AdmissionState::Admitted => "admitted",
            AdmissionState::Discharged => "discharged",
        };
        f.write_str(label)
    }
}

/// Bed-to-bed transfer recorded on an admission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionMove {
    pub from_bed_id: Uuid,
    pub to_bed_id: Uuid,
    pub moved_at: DateTime<Utc>,
    pub moved_by: Uuid,
}

/// Inpatient stay, driving the bed lifecycle on confirm/discharge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: Uuid,
    pub reference: String,
    pub patient_id: Uuid,
    pub service_id: Uuid,
    pub bed_id: Option<Uuid>,
    pub state: AdmissionState,
    pub admit_at: DateTime<Utc>,
    pub discharge_at: Option<DateTime<Utc>>,
    pub moves: Vec<AdmissionMove>,
    pub created_by: Uuid,
}

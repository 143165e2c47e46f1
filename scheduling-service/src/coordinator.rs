use crate::beds::BedLifecycle;
use crate::calendar::ResourceCalendar;
use crate::config::SchedulingConfig;
use crate::error::{SchedulingError, SchedulingResult};
use crate::models::{
    Admission, AdmissionMove, AdmissionState, Booking, BookingAction, BookingKind, BookingRequest,
    BookingState, Resource, TimeSlot,
};
use chrono::Utc;
use clinic_core::{DocumentKind, SequenceGenerator, SessionContext};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Orchestrates reservation and lifecycle of the three booking kinds
///
/// All three surfaces (appointments, consultations, operations) go through
/// the same conflict check and the same state machine. The booking set lives
/// behind one write lock so a reservation's check-then-act sequence commits
/// atomically: of two concurrent reservations on the same slot, the loser
/// re-validates against the winner's committed booking and gets a conflict.
pub struct BookingCoordinator {
    config: SchedulingConfig,
    resources: Arc<RwLock<HashMap<Uuid, Resource>>>,
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
    admissions: Arc<RwLock<HashMap<Uuid, Admission>>>,
    beds: Arc<BedLifecycle>,
    sequences: Arc<dyn SequenceGenerator>,
}

impl BookingCoordinator {
    pub fn new(beds: Arc<BedLifecycle>, sequences: Arc<dyn SequenceGenerator>) -> Self {
        Self {
            config: SchedulingConfig::default(),
            resources: Arc::new(RwLock::new(HashMap::new())),
            bookings: Arc::new(RwLock::new(HashMap::new())),
            admissions: Arc::new(RwLock::new(HashMap::new())),
            beds,
            sequences,
        }
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    // ========================================================================
    // RESOURCES
    // ========================================================================

    /// Register a bookable resource; codes are unique per kind
    pub async fn register_resource(&self, resource: Resource) -> SchedulingResult<Resource> {
        let mut resources = self.resources.write().await;
        if resources
            .values()
            .any(|known| known.kind == resource.kind && known.code == resource.code)
        {
            return Err(SchedulingError::validation(
                "code",
                format!("resource code {} already registered", resource.code),
            ));
        }
        resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    pub async fn resource(&self, resource_id: Uuid) -> SchedulingResult<Resource> {
        let resources = self.resources.read().await;
        resources
            .get(&resource_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("resource {}", resource_id)))
    }

    // ========================================================================
    // RESERVATION
    // ========================================================================

    /// Reserve every requested resource for the slot, atomically
    ///
    /// A booking may bind two independent resources (room and doctor); the
    /// first conflict on any of them rejects the whole reservation and no
    /// resource is held.
    pub async fn reserve(
        &self,
        request: BookingRequest,
        ctx: &SessionContext,
    ) -> SchedulingResult<Booking> {
        if request.resource_ids.is_empty() || request.resource_ids.len() > 2 {
            return Err(SchedulingError::validation(
                "resource_ids",
                "a booking binds one or two resources",
            ));
        }
        {
            let resources = self.resources.read().await;
            for resource_id in &request.resource_ids {
                if !resources.contains_key(resource_id) {
                    return Err(SchedulingError::NotFound(format!("resource {}", resource_id)));
                }
            }
        }
        let slot = self.requested_slot(&request)?;
        let reference = self
            .sequences
            .next_reference(request.kind.document_kind())
            .await;

        let mut bookings = self.bookings.write().await;
        for resource_id in &request.resource_ids {
            let conflicts =
                ResourceCalendar::find_conflicts(bookings.values(), *resource_id, slot, None);
            if let Some(conflict) = conflicts.first() {
                warn!(
                    resource = %resource_id,
                    conflicting = %conflict.reference,
                    "reservation rejected"
                );
                return Err(SchedulingError::Conflict {
                    resource_id: *resource_id,
                    conflicting_booking_id: conflict.id,
                    conflicting_reference: conflict.reference.clone(),
                });
            }
        }

        let state = if request.urgent {
            BookingState::Confirmed
        } else {
            BookingState::Draft
        };
        let booking = Booking {
            id: Uuid::new_v4(),
            reference,
            kind: request.kind,
            patient_id: request.patient_id,
            resource_ids: request.resource_ids,
            start: slot.start,
            end: slot.end,
            state,
            urgent: request.urgent,
            reason: None,
            follow_up_id: None,
            note: request.note,
            created_by: ctx.user_id,
            created_at: Utc::now(),
        };
        bookings.insert(booking.id, booking.clone());
        info!(reference = %booking.reference, kind = ?booking.kind, "booking reserved");
        Ok(booking)
    }

    /// Move a live booking to new resources and/or a new slot
    ///
    /// Same conflict check as `reserve`, with the booking itself excluded.
    /// Resources, interval and patient are protected once the booking is
    /// done or cancelled.
    pub async fn reschedule(
        &self,
        booking_id: Uuid,
        slot: TimeSlot,
        resource_ids: Option<Vec<Uuid>>,
        _ctx: &SessionContext,
    ) -> SchedulingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let current = bookings
            .get(&booking_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))?;
        if current.state.is_terminal() {
            return Err(SchedulingError::illegal_transition("reschedule", current.state));
        }
        let targets = resource_ids.unwrap_or_else(|| current.resource_ids.clone());
        if targets.is_empty() || targets.len() > 2 {
            return Err(SchedulingError::validation(
                "resource_ids",
                "a booking binds one or two resources",
            ));
        }
        for resource_id in &targets {
            let conflicts = ResourceCalendar::find_conflicts(
                bookings.values(),
                *resource_id,
                slot,
                Some(booking_id),
            );
            if let Some(conflict) = conflicts.first() {
                return Err(SchedulingError::Conflict {
                    resource_id: *resource_id,
                    conflicting_booking_id: conflict.id,
                    conflicting_reference: conflict.reference.clone(),
                });
            }
        }
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))?;
        booking.resource_ids = targets;
        booking.start = slot.start;
        booking.end = slot.end;
        info!(reference = %booking.reference, "booking rescheduled");
        Ok(booking.clone())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Drive the shared state machine: draft → confirmed → in_progress → done,
    /// cancel from any non-terminal state
    pub async fn transition(
        &self,
        booking_id: Uuid,
        action: BookingAction,
        _ctx: &SessionContext,
    ) -> SchedulingResult<BookingState> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))?;

        let next = match (action, booking.state) {
            (BookingAction::Confirm, BookingState::Draft) => BookingState::Confirmed,
            (BookingAction::Start, BookingState::Confirmed) => {
                if booking.resource_ids.is_empty() {
                    return Err(SchedulingError::validation(
                        "resource_ids",
                        "cannot start a booking without its resources",
                    ));
                }
                BookingState::InProgress
            }
            (BookingAction::Finish, BookingState::InProgress) => {
                Self::completeness_gate(booking)?;
                BookingState::Done
            }
            (BookingAction::Cancel, state) if !state.is_terminal() => BookingState::Cancelled,
            (action, state) => {
                return Err(SchedulingError::illegal_transition(action.as_str(), state));
            }
        };
        booking.state = next;
        let follow_up = booking.follow_up_id;
        info!(reference = %booking.reference, state = %next, "booking transition");

        // Completion flows through to the linked downstream booking
        if next == BookingState::Done {
            if let Some(follow_up_id) = follow_up {
                if let Some(linked) = bookings.get_mut(&follow_up_id) {
                    if !linked.state.is_terminal() {
                        linked.state = BookingState::Done;
                        info!(reference = %linked.reference, "completion propagated");
                    }
                }
            }
        }
        Ok(next)
    }

    /// Record the complaint / operative report gating `finish`
    pub async fn record_reason(
        &self,
        booking_id: Uuid,
        reason: impl Into<String>,
    ) -> SchedulingResult<()> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))?;
        if booking.state.is_terminal() {
            return Err(SchedulingError::illegal_transition("record_reason", booking.state));
        }
        booking.reason = Some(reason.into());
        Ok(())
    }

    /// Link a downstream booking (appointment → consultation)
    pub async fn link_follow_up(
        &self,
        booking_id: Uuid,
        follow_up_id: Uuid,
    ) -> SchedulingResult<()> {
        let mut bookings = self.bookings.write().await;
        if !bookings.contains_key(&follow_up_id) {
            return Err(SchedulingError::NotFound(format!("booking {}", follow_up_id)));
        }
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))?;
        if booking.state.is_terminal() {
            return Err(SchedulingError::illegal_transition("link_follow_up", booking.state));
        }
        booking.follow_up_id = Some(follow_up_id);
        Ok(())
    }

    pub async fn booking(&self, booking_id: Uuid) -> SchedulingResult<Booking> {
        let bookings = self.bookings.read().await;
        bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("booking {}", booking_id)))
    }

    /// Snapshot of a resource's active bookings over a range, ordered by start
    pub async fn calendar(&self, resource_id: Uuid, range: TimeSlot) -> Vec<Booking> {
        let bookings = self.bookings.read().await;
        let mut view: Vec<Booking> = ResourceCalendar::find_conflicts(
            bookings.values(),
            resource_id,
            range,
            None,
        )
        .into_iter()
        .cloned()
        .collect();
        view.sort_by_key(|booking| booking.start);
        view
    }

    // ========================================================================
    // ADMISSIONS
    // ========================================================================

    /// Open an inpatient admission in pre-admit
    pub async fn open_admission(
        &self,
        patient_id: Uuid,
        service_id: Uuid,
        bed_id: Option<Uuid>,
        ctx: &SessionContext,
    ) -> SchedulingResult<Admission> {
        let reference = self.sequences.next_reference(DocumentKind::Admission).await;
        let admission = Admission {
            id: Uuid::new_v4(),
            reference,
            patient_id,
            service_id,
            bed_id,
            state: AdmissionState::PreAdmit,
            admit_at: Utc::now(),
            discharge_at: None,
            moves: Vec::new(),
            created_by: ctx.user_id,
        };
        let mut admissions = self.admissions.write().await;
        admissions.insert(admission.id, admission.clone());
        info!(reference = %admission.reference, "admission opened");
        Ok(admission)
    }

    /// Pick the bed for a pre-admit admission
    pub async fn assign_admission_bed(
        &self,
        admission_id: Uuid,
        bed_id: Uuid,
    ) -> SchedulingResult<Admission> {
        let mut admissions = self.admissions.write().await;
        let admission = admissions
            .get_mut(&admission_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("admission {}", admission_id)))?;
        if admission.state != AdmissionState::PreAdmit {
            return Err(SchedulingError::illegal_transition("assign_bed", admission.state));
        }
        admission.bed_id = Some(bed_id);
        Ok(admission.clone())
    }

    /// Confirm the admission: requires a bed, occupies it
    pub async fn confirm_admission(
        &self,
        admission_id: Uuid,
        _ctx: &SessionContext,
    ) -> SchedulingResult<Admission> {
        let mut admissions = self.admissions.write().await;
        let admission = admissions
            .get_mut(&admission_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("admission {}", admission_id)))?;
        if admission.state != AdmissionState::PreAdmit {
            return Err(SchedulingError::illegal_transition("confirm", admission.state));
        }
        let bed_id = admission.bed_id.ok_or_else(|| {
            SchedulingError::validation("bed_id", "an admission cannot be confirmed without a bed")
        })?;
        // Bed must actually be assignable; admission is untouched on failure
        self.beds
            .assign(bed_id, admission.patient_id, admission.id)
            .await?;
        admission.state = AdmissionState::Admitted;
        info!(reference = %admission.reference, "admission confirmed");
        Ok(admission.clone())
    }

    /// Move an admitted patient to another bed
    pub async fn transfer_admission(
        &self,
        admission_id: Uuid,
        to_bed_id: Uuid,
        ctx: &SessionContext,
    ) -> SchedulingResult<Admission> {
        let mut admissions = self.admissions.write().await;
        let admission = admissions
            .get_mut(&admission_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("admission {}", admission_id)))?;
        if admission.state != AdmissionState::Admitted {
            return Err(SchedulingError::illegal_transition("transfer", admission.state));
        }
        let from_bed_id = admission.bed_id.ok_or_else(|| {
            SchedulingError::validation("bed_id", "admitted admission has no bed on record")
        })?;
        self.beds
            .transfer(from_bed_id, to_bed_id, admission.patient_id, admission.id)
            .await?;
        admission.bed_id = Some(to_bed_id);
        admission.moves.push(AdmissionMove {
            from_bed_id,
            to_bed_id,
            moved_at: Utc::now(),
            moved_by: ctx.user_id,
        });
        info!(reference = %admission.reference, "patient transferred");
        Ok(admission.clone())
    }

    /// Discharge the patient and release the bed
    pub async fn discharge(
        &self,
        admission_id: Uuid,
        _ctx: &SessionContext,
    ) -> SchedulingResult<Admission> {
        let mut admissions = self.admissions.write().await;
        let admission = admissions
            .get_mut(&admission_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("admission {}", admission_id)))?;
        if admission.state != AdmissionState::Admitted {
            return Err(SchedulingError::illegal_transition("discharge", admission.state));
        }
        let bed_id = admission.bed_id.ok_or_else(|| {
            SchedulingError::validation("bed_id", "admitted admission has no bed on record")
        })?;
        self.beds.free(bed_id).await?;
        admission.state = AdmissionState::Discharged;
        admission.discharge_at = Some(Utc::now());
        info!(reference = %admission.reference, "patient discharged");
        Ok(admission.clone())
    }

    pub async fn admission(&self, admission_id: Uuid) -> SchedulingResult<Admission> {
        let admissions = self.admissions.read().await;
        admissions
            .get(&admission_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("admission {}", admission_id)))
    }

    fn requested_slot(&self, request: &BookingRequest) -> SchedulingResult<TimeSlot> {
        match request.end {
            Some(end) => TimeSlot::new(request.start, end),
            None => Ok(TimeSlot::starting_at(
                request.start,
                self.config.default_duration(request.kind),
            )),
        }
    }

    /// Kind-specific completeness required before `finish`
    fn completeness_gate(booking: &Booking) -> SchedulingResult<()> {
        match booking.kind {
            BookingKind::Appointment => Ok(()),
            BookingKind::Consultation | BookingKind::Operation => {
                if booking.reason.as_deref().map_or(true, str::is_empty) {
                    return Err(SchedulingError::validation(
                        "reason",
                        "a consultation or operation needs its report before closing",
                    ));
                }
                Ok(())
            }
        }
    }
}

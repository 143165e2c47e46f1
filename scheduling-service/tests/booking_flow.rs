//! Booking and admission flows through the coordinator

use chrono::{DateTime, Utc};
use clinic_core::{InMemorySequences, SessionContext};
use scheduling_service::{
    BedLifecycle, BookingAction, BookingCoordinator, BookingKind, BookingRequest, BookingState,
    Resource, ResourceKind, SchedulingError, TimeSlot,
};
use std::sync::Arc;
use uuid::Uuid;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
        .and_utc()
}

fn ctx() -> SessionContext {
    SessionContext::new(Uuid::new_v4(), "reception")
}

struct Setup {
    coordinator: BookingCoordinator,
    beds: Arc<BedLifecycle>,
    room: Resource,
    doctor: Resource,
}

async fn setup() -> Setup {
    let beds = Arc::new(BedLifecycle::new());
    let coordinator =
        BookingCoordinator::new(beds.clone(), Arc::new(InMemorySequences::new()));
    let room = coordinator
        .register_resource(Resource::new("C1", "Consultation 1", ResourceKind::ConsultationRoom))
        .await
        .unwrap();
    let doctor = coordinator
        .register_resource(Resource::new("DR1", "Dr. Amrani", ResourceKind::Doctor))
        .await
        .unwrap();
    Setup {
        coordinator,
        beds,
        room,
        doctor,
    }
}

#[tokio::test]
async fn test_overlapping_reservation_is_rejected() {
    let s = setup().await;
    let first = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
        .until(at(10, 30))
        .on_resource(s.room.id);
    s.coordinator.reserve(first, &ctx()).await.unwrap();

    let second = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 15))
        .until(at(10, 45))
        .on_resource(s.room.id);
    let result = s.coordinator.reserve(second, &ctx()).await;
    match result {
        Err(SchedulingError::Conflict { resource_id, .. }) => assert_eq!(resource_id, s.room.id),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_touching_boundary_is_not_a_conflict() {
    let s = setup().await;
    let first = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
        .until(at(10, 30))
        .on_resource(s.room.id);
    let second = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 30))
        .until(at(11, 0))
        .on_resource(s.room.id);

    s.coordinator.reserve(first, &ctx()).await.unwrap();
    s.coordinator.reserve(second, &ctx()).await.unwrap();
}

#[tokio::test]
async fn test_point_in_time_request_gets_a_default_duration() {
    let s = setup().await;
    let request = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
        .on_resource(s.room.id);
    let booking = s.coordinator.reserve(request, &ctx()).await.unwrap();
    assert_eq!(booking.end, at(10, 30));

    // The defaulted interval still blocks the slot
    let inside = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 15))
        .until(at(10, 20))
        .on_resource(s.room.id);
    assert!(s.coordinator.reserve(inside, &ctx()).await.is_err());
}

#[tokio::test]
async fn test_failed_two_resource_reservation_holds_nothing() {
    let s = setup().await;
    // Doctor already taken on the slot
    let hold = BookingRequest::new(BookingKind::Consultation, Uuid::new_v4(), at(10, 0))
        .until(at(11, 0))
        .on_resource(s.doctor.id);
    s.coordinator.reserve(hold, &ctx()).await.unwrap();

    let both = BookingRequest::new(BookingKind::Consultation, Uuid::new_v4(), at(10, 0))
        .until(at(11, 0))
        .on_resource(s.room.id)
        .on_resource(s.doctor.id);
    assert!(s.coordinator.reserve(both, &ctx()).await.is_err());

    // The room was not partially held by the failed reservation
    let room_only = BookingRequest::new(BookingKind::Consultation, Uuid::new_v4(), at(10, 0))
        .until(at(11, 0))
        .on_resource(s.room.id);
    s.coordinator.reserve(room_only, &ctx()).await.unwrap();
}

#[tokio::test]
async fn test_state_machine_happy_path_and_guards() {
    let s = setup().await;
    let request = BookingRequest::new(BookingKind::Consultation, Uuid::new_v4(), at(10, 0))
        .until(at(10, 30))
        .on_resource(s.room.id);
    let booking = s.coordinator.reserve(request, &ctx()).await.unwrap();
    assert_eq!(booking.state, BookingState::Draft);

    // Cannot start from draft
    let premature = s
        .coordinator
        .transition(booking.id, BookingAction::Start, &ctx())
        .await;
    assert!(matches!(premature, Err(SchedulingError::IllegalTransition { .. })));

    s.coordinator
        .transition(booking.id, BookingAction::Confirm, &ctx())
        .await
        .unwrap();
    s.coordinator
        .transition(booking.id, BookingAction::Start, &ctx())
        .await
        .unwrap();

    // Finish requires the recorded complaint
    let incomplete = s
        .coordinator
        .transition(booking.id, BookingAction::Finish, &ctx())
        .await;
    assert!(matches!(incomplete, Err(SchedulingError::Validation { .. })));

    s.coordinator
        .record_reason(booking.id, "lombalgie aiguë")
        .await
        .unwrap();
    let state = s
        .coordinator
        .transition(booking.id, BookingAction::Finish, &ctx())
        .await
        .unwrap();
    assert_eq!(state, BookingState::Done);

    // Terminal: no further action, protected fields frozen
    let after = s
        .coordinator
        .transition(booking.id, BookingAction::Cancel, &ctx())
        .await;
    assert!(matches!(after, Err(SchedulingError::IllegalTransition { .. })));
    let slot = TimeSlot::new(at(14, 0), at(15, 0)).unwrap();
    let moved = s.coordinator.reschedule(booking.id, slot, None, &ctx()).await;
    assert!(matches!(moved, Err(SchedulingError::IllegalTransition { .. })));
}

#[tokio::test]
async fn test_cancel_releases_the_slot_immediately() {
    let s = setup().await;
    let request = BookingRequest::new(BookingKind::Operation, Uuid::new_v4(), at(8, 0))
        .until(at(9, 0))
        .on_resource(s.room.id);
    let booking = s.coordinator.reserve(request, &ctx()).await.unwrap();
    s.coordinator
        .transition(booking.id, BookingAction::Cancel, &ctx())
        .await
        .unwrap();

    let retry = BookingRequest::new(BookingKind::Operation, Uuid::new_v4(), at(8, 0))
        .until(at(9, 0))
        .on_resource(s.room.id);
    s.coordinator.reserve(retry, &ctx()).await.unwrap();
}

#[tokio::test]
async fn test_urgent_reservation_starts_confirmed() {
    let s = setup().await;
    let request = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
        .on_resource(s.room.id)
        .urgent();
    let booking = s.coordinator.reserve(request, &ctx()).await.unwrap();
    assert_eq!(booking.state, BookingState::Confirmed);
}

#[tokio::test]
async fn test_finish_propagates_to_linked_follow_up() {
    let s = setup().await;
    let patient = Uuid::new_v4();
    let appointment = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, patient, at(9, 0))
                .until(at(9, 30))
                .on_resource(s.room.id)
                .urgent(),
            &ctx(),
        )
        .await
        .unwrap();
    let consultation = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Consultation, patient, at(9, 30))
                .until(at(10, 0))
                .on_resource(s.room.id)
                .urgent(),
            &ctx(),
        )
        .await
        .unwrap();
    s.coordinator
        .link_follow_up(appointment.id, consultation.id)
        .await
        .unwrap();

    s.coordinator
        .transition(appointment.id, BookingAction::Start, &ctx())
        .await
        .unwrap();
    s.coordinator
        .transition(appointment.id, BookingAction::Finish, &ctx())
        .await
        .unwrap();

    let linked = s.coordinator.booking(consultation.id).await.unwrap();
    assert_eq!(linked.state, BookingState::Done);
}

#[tokio::test]
async fn test_reschedule_checks_conflicts_excluding_itself() {
    let s = setup().await;
    let booking = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
                .until(at(10, 30))
                .on_resource(s.room.id),
            &ctx(),
        )
        .await
        .unwrap();

    // Shifting within its own old slot is fine
    let shifted = TimeSlot::new(at(10, 15), at(10, 45)).unwrap();
    s.coordinator
        .reschedule(booking.id, shifted, None, &ctx())
        .await
        .unwrap();

    // But not onto another booking
    let other = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(11, 0))
                .until(at(11, 30))
                .on_resource(s.room.id),
            &ctx(),
        )
        .await
        .unwrap();
    let onto_other = TimeSlot::new(at(11, 0), at(11, 30)).unwrap();
    let result = s
        .coordinator
        .reschedule(booking.id, onto_other, None, &ctx())
        .await;
    assert!(matches!(result, Err(SchedulingError::Conflict { .. })));
    let _ = other;
}

#[tokio::test]
async fn test_query_calendar_returns_active_bookings_in_order() {
    let s = setup().await;
    let late = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(11, 0))
                .until(at(11, 30))
                .on_resource(s.room.id),
            &ctx(),
        )
        .await
        .unwrap();
    let early = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(9, 0))
                .until(at(9, 30))
                .on_resource(s.room.id),
            &ctx(),
        )
        .await
        .unwrap();
    let cancelled = s
        .coordinator
        .reserve(
            BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
                .until(at(10, 30))
                .on_resource(s.room.id),
            &ctx(),
        )
        .await
        .unwrap();
    s.coordinator
        .transition(cancelled.id, BookingAction::Cancel, &ctx())
        .await
        .unwrap();

    let day = TimeSlot::new(at(0, 1), at(23, 59)).unwrap();
    let view = s.coordinator.calendar(s.room.id, day).await;
    let ids: Vec<_> = view.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

#[tokio::test]
async fn test_concurrent_reservations_admit_exactly_one_winner() {
    let beds = Arc::new(BedLifecycle::new());
    let coordinator = Arc::new(BookingCoordinator::new(
        beds,
        Arc::new(InMemorySequences::new()),
    ));
    let room = coordinator
        .register_resource(Resource::new("C1", "Consultation 1", ResourceKind::ConsultationRoom))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        let room_id = room.id;
        tasks.push(tokio::spawn(async move {
            let request = BookingRequest::new(BookingKind::Appointment, Uuid::new_v4(), at(10, 0))
                .until(at(10, 30))
                .on_resource(room_id);
            coordinator.reserve(request, &ctx()).await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_admission_confirm_requires_a_bed() {
    let s = setup().await;
    let admission = s
        .coordinator
        .open_admission(Uuid::new_v4(), Uuid::new_v4(), None, &ctx())
        .await
        .unwrap();

    let result = s.coordinator.confirm_admission(admission.id, &ctx()).await;
    match result {
        Err(SchedulingError::Validation { field, .. }) => assert_eq!(field, "bed_id"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_admission_confirm_discharge_cycle_drives_the_bed() {
    let s = setup().await;
    let service = Uuid::new_v4();
    let bed = s.beds.register_bed("B-201", service).await.unwrap();
    let patient = Uuid::new_v4();

    let admission = s
        .coordinator
        .open_admission(patient, service, Some(bed.id), &ctx())
        .await
        .unwrap();
    s.coordinator.confirm_admission(admission.id, &ctx()).await.unwrap();

    // Bed now occupied: a second admission on it cannot confirm
    let rival = s
        .coordinator
        .open_admission(Uuid::new_v4(), service, Some(bed.id), &ctx())
        .await
        .unwrap();
    assert!(s.coordinator.confirm_admission(rival.id, &ctx()).await.is_err());

    let discharged = s.coordinator.discharge(admission.id, &ctx()).await.unwrap();
    assert!(discharged.discharge_at.is_some());

    let occupations = s.beds.occupations(bed.id).await;
    assert_eq!(occupations.len(), 1);
    assert!(occupations[0].left_at.is_some());
    assert!(occupations[0].stay_days(Utc::now()) >= 0);
}

#[tokio::test]
async fn test_admission_transfer_records_the_move() {
    let s = setup().await;
    let service = Uuid::new_v4();
    let first_bed = s.beds.register_bed("B-201", service).await.unwrap();
    let second_bed = s.beds.register_bed("B-202", service).await.unwrap();

    let admission = s
        .coordinator
        .open_admission(Uuid::new_v4(), service, Some(first_bed.id), &ctx())
        .await
        .unwrap();
    s.coordinator.confirm_admission(admission.id, &ctx()).await.unwrap();

    let moved = s
        .coordinator
        .transfer_admission(admission.id, second_bed.id, &ctx())
        .await
        .unwrap();
    assert_eq!(moved.bed_id, Some(second_bed.id));
    assert_eq!(moved.moves.len(), 1);
    assert_eq!(moved.moves[0].from_bed_id, first_bed.id);
}

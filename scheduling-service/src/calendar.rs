use crate::models::{Booking, TimeSlot};
use uuid::Uuid;

/// Overlap queries over a set of bookings
///
/// Pure scan, no side effects. Cancelled and finished bookings no longer
/// hold their slot, so they never count as conflicts.
pub struct ResourceCalendar;

impl ResourceCalendar {
    /// Active bookings on `resource_id` whose interval overlaps `slot`,
    /// excluding `exclude` (the booking being re-validated, if any)
    pub fn find_conflicts<'a, I>(
        bookings: I,
        resource_id: Uuid,
        slot: TimeSlot,
        exclude: Option<Uuid>,
    ) -> Vec<&'a Booking>
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        let mut conflicts: Vec<&Booking> = bookings
            .into_iter()
            .filter(|booking| Some(booking.id) != exclude)
            .filter(|booking| booking.is_active())
            .filter(|booking| booking.binds(resource_id))
            .filter(|booking| booking.slot().overlaps(&slot))
            .collect();
        conflicts.sort_by_key(|booking| booking.start);
        conflicts
    }

    /// Whether the resource is free for the whole slot
    pub fn is_free<'a, I>(bookings: I, resource_id: Uuid, slot: TimeSlot) -> bool
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        Self::find_conflicts(bookings, resource_id, slot, None).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingKind, BookingState};
    use chrono::{DateTime, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    fn booking(resource_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>, state: BookingState) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            reference: "APT-000001".to_string(),
            kind: BookingKind::Appointment,
            patient_id: Uuid::new_v4(),
            resource_ids: vec![resource_id],
            start,
            end,
            state,
            urgent: false,
            reason: None,
            follow_up_id: None,
            note: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlapping_booking_is_a_conflict() {
        let room = Uuid::new_v4();
        let existing = booking(room, at(10, 0), at(10, 30), BookingState::Confirmed);
        let slot = TimeSlot::new(at(10, 15), at(10, 45)).unwrap();

        let conflicts = ResourceCalendar::find_conflicts([&existing], room, slot, None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, existing.id);
    }

    #[test]
    fn test_cancelled_booking_releases_the_slot() {
        let room = Uuid::new_v4();
        let cancelled = booking(room, at(10, 0), at(10, 30), BookingState::Cancelled);
        let slot = TimeSlot::new(at(10, 0), at(10, 30)).unwrap();

        assert!(ResourceCalendar::is_free([&cancelled], room, slot));
    }

    #[test]
    fn test_other_resource_does_not_conflict() {
        let room = Uuid::new_v4();
        let other_room = Uuid::new_v4();
        let existing = booking(other_room, at(10, 0), at(10, 30), BookingState::Confirmed);
        let slot = TimeSlot::new(at(10, 0), at(10, 30)).unwrap();

        assert!(ResourceCalendar::is_free([&existing], room, slot));
    }

    #[test]
    fn test_exclude_skips_the_booking_under_edit() {
        let room = Uuid::new_v4();
        let existing = booking(room, at(10, 0), at(10, 30), BookingState::Confirmed);
        let slot = TimeSlot::new(at(10, 0), at(11, 0)).unwrap();

        let conflicts =
            ResourceCalendar::find_conflicts([&existing], room, slot, Some(existing.id));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_conflicts_are_sorted_by_start() {
        let room = Uuid::new_v4();
        let late = booking(room, at(11, 0), at(11, 30), BookingState::Confirmed);
        let early = booking(room, at(9, 0), at(12, 0), BookingState::InProgress);
        let slot = TimeSlot::new(at(9, 0), at(12, 0)).unwrap();

        let conflicts = ResourceCalendar::find_conflicts([&late, &early], room, slot, None);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].id, early.id);
    }
}

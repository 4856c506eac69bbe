use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Booking, BookingId, OperatingWindow, StaffId, TimeSlot};

/// Slots for one staff member on one day, in window order.
///
/// A slot is unavailable when it lies strictly before `now` or when an
/// active booking for the same staff member sits on it. `exclude` skips one
/// booking so an edit does not collide with its own prior slot.
pub fn generate(
    window: &OperatingWindow,
    date: NaiveDate,
    staff_id: StaffId,
    bookings: &[Booking],
    now: NaiveDateTime,
    exclude: Option<BookingId>,
) -> Vec<TimeSlot> {
    window
        .instants(date)
        .map(|instant| TimeSlot {
            time: instant.time(),
            available: instant >= now && !is_occupied(bookings, staff_id, instant, exclude),
        })
        .collect()
}

pub fn is_occupied(
    bookings: &[Booking],
    staff_id: StaffId,
    instant: NaiveDateTime,
    exclude: Option<BookingId>,
) -> bool {
    bookings.iter().any(|b| {
        b.is_active()
            && b.staff_id == staff_id
            && b.scheduled_at == instant
            && Some(b.id) != exclude
    })
}

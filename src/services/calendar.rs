use chrono::{Duration, NaiveDateTime};

use crate::models::{Booking, BookingStatus};
use crate::services::catalog::Catalog;

const PRODID: &str = "-//Bookingdesk//Appointments//EN";

/// Minutes assumed when a booking points at a service no longer listed.
const FALLBACK_DURATION_MINUTES: u32 = 30;

fn format_ics(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

/// `DTSTAMP` must be UTC, marked with a trailing `Z`.
fn format_ics_utc(dt: &NaiveDateTime) -> String {
    format!("{}Z", format_ics(dt))
}

/// RFC 5545 text escaping. Line breaks of any style become `\n`.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace(['\r', '\n'], "\\n")
}

fn vevent(booking: &Booking, catalog: &Catalog, stamp: &NaiveDateTime) -> String {
    let service = catalog.service(booking.service_id);
    let duration = service.map_or(FALLBACK_DURATION_MINUTES, |s| s.duration_minutes);
    let service_name = service.map_or("Appointment", |s| s.name.as_str());
    let staff_name = catalog
        .staff(booking.staff_id)
        .map_or("staff", |s| s.name.as_str());

    let dtstart = format_ics(&booking.scheduled_at);
    let dtend = format_ics(&(booking.scheduled_at + Duration::minutes(i64::from(duration))));
    let summary = escape(&format!("{service_name} with {staff_name}"));
    let description = if booking.notes.trim().is_empty() {
        "No additional notes".to_string()
    } else {
        escape(&booking.notes)
    };
    let attendee = escape(&booking.customer_name);
    let status = match booking.status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Confirmed | BookingStatus::Completed => "CONFIRMED",
    };

    format!(
        "BEGIN:VEVENT\r\n\
         UID:booking-{id}@bookingdesk\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         CONTACT:{attendee}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n",
        id = booking.id,
        dtstamp = format_ics_utc(stamp),
    )
}

fn wrap(events: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:{PRODID}\r\n\
         {events}\
         END:VCALENDAR\r\n"
    )
}

pub fn generate_ics(booking: &Booking, catalog: &Catalog, stamp: &NaiveDateTime) -> String {
    wrap(&vevent(booking, catalog, stamp))
}

/// One calendar holding every active booking.
pub fn generate_feed(bookings: &[Booking], catalog: &Catalog, stamp: &NaiveDateTime) -> String {
    let events: String = bookings
        .iter()
        .filter(|b| b.is_active())
        .map(|b| vevent(b, catalog, stamp))
        .collect();
    wrap(&events)
}

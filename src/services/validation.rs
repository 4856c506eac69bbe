use chrono::NaiveDateTime;

use crate::errors::FieldErrors;
use crate::models::{Booking, BookingDraft, BookingStatus, OperatingWindow};
use crate::services::availability;
use crate::services::catalog::Catalog;

/// Everything a draft is checked against.
pub struct ValidationContext<'a> {
    pub catalog: &'a Catalog,
    pub bookings: &'a [Booking],
    pub window: &'a OperatingWindow,
    pub now: NaiveDateTime,
    /// The stored record when the draft edits an existing booking.
    pub editing: Option<&'a Booking>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCheck {
    Open,
    PastDate,
    OutsideHours,
    Passed,
    Occupied,
}

impl SlotCheck {
    fn message(&self) -> Option<&'static str> {
        match self {
            SlotCheck::Open => None,
            SlotCheck::PastDate => Some("Date cannot be in the past"),
            SlotCheck::OutsideHours => {
                Some("Time must be a 30-minute slot between 09:00 and 17:00")
            }
            SlotCheck::Passed => Some("That time has already passed"),
            SlotCheck::Occupied => Some("That time slot is already booked"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Checked {
    /// Field errors other than slot occupancy.
    pub errors: FieldErrors,
    pub slot: SlotCheck,
    pub status: Option<BookingStatus>,
}

impl Checked {
    /// Field map with an occupied slot reported under `scheduledAt`.
    pub fn into_field_errors(self) -> FieldErrors {
        let mut errors = self.errors;
        if let Some(message) = self.slot.message() {
            errors.add("scheduledAt", message);
        }
        errors
    }
}

pub fn validate(ctx: &ValidationContext<'_>, draft: &BookingDraft) -> FieldErrors {
    check(ctx, draft).into_field_errors()
}

pub fn check(ctx: &ValidationContext<'_>, draft: &BookingDraft) -> Checked {
    let mut errors = FieldErrors::new();

    if draft.customer_name.trim().is_empty() {
        errors.add("customerName", "Customer name is required");
    }

    if draft.customer_email.trim().is_empty() {
        errors.add("customerEmail", "Email is required");
    } else if !is_valid_email(draft.customer_email.trim()) {
        errors.add("customerEmail", "Email is invalid");
    }

    if draft.customer_phone.trim().is_empty() {
        errors.add("customerPhone", "Phone number is required");
    }

    let service = ctx.catalog.service(draft.service_id);
    if service.is_none() {
        errors.add("serviceId", "Service does not exist");
    }

    if ctx.catalog.staff(draft.staff_id).is_none() {
        errors.add("staffId", "Staff member does not exist");
    } else if service.is_some()
        && !ctx.catalog.staff_can_perform(draft.staff_id, draft.service_id)
    {
        errors.add("staffId", "Staff member does not offer this service");
    }

    let status = match draft.status.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = BookingStatus::parse(raw);
            if parsed.is_none() {
                errors.add(
                    "status",
                    "Status must be one of pending, confirmed, completed, cancelled",
                );
            }
            parsed
        }
    };

    let slot = check_slot(ctx, draft, status);
    if slot != SlotCheck::Occupied {
        if let Some(message) = slot.message() {
            errors.add("scheduledAt", message);
        }
    }

    Checked {
        errors,
        slot,
        status,
    }
}

fn check_slot(
    ctx: &ValidationContext<'_>,
    draft: &BookingDraft,
    status: Option<BookingStatus>,
) -> SlotCheck {
    let at = draft.scheduled_at;
    // Re-saving the same appointment is allowed even once it is behind us.
    // Moving it to other staff or another service counts as a new slot.
    let unchanged = ctx.editing.is_some_and(|prior| {
        prior.scheduled_at == at
            && prior.staff_id == draft.staff_id
            && prior.service_id == draft.service_id
    });

    if !unchanged && at.date() < ctx.now.date() {
        return SlotCheck::PastDate;
    }

    if !ctx.window.contains(at.time()) {
        return SlotCheck::OutsideHours;
    }

    let slots = availability::generate(
        ctx.window,
        at.date(),
        draft.staff_id,
        ctx.bookings,
        ctx.now,
        ctx.editing.map(|prior| prior.id),
    );

    let Some(slot) = slots.iter().find(|s| s.time == at.time()) else {
        return SlotCheck::OutsideHours;
    };

    if slot.available {
        return SlotCheck::Open;
    }

    if at < ctx.now && !unchanged {
        return SlotCheck::Passed;
    }

    let active = status.map_or(true, |s| s != BookingStatus::Cancelled);
    let exclude = ctx.editing.map(|prior| prior.id);
    if active && availability::is_occupied(ctx.bookings, draft.staff_id, at, exclude) {
        SlotCheck::Occupied
    } else {
        SlotCheck::Open
    }
}

/// local-part "@" domain, with a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

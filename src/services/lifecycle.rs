use crate::errors::BookingError;
use crate::models::BookingStatus;

/// Statuses reachable in one step from `from`.
pub fn allowed_transitions(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
        BookingStatus::Completed | BookingStatus::Cancelled => &[],
    }
}

pub fn is_terminal(status: BookingStatus) -> bool {
    allowed_transitions(status).is_empty()
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

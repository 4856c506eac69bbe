use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Booking, BookingId};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingEvent {
    Created { booking: Booking },
    Updated { booking: Booking },
    StatusChanged { booking: Booking },
    Deleted { id: BookingId },
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::Created { .. } => "created",
            BookingEvent::Updated { .. } => "updated",
            BookingEvent::StatusChanged { .. } => "status_changed",
            BookingEvent::Deleted { .. } => "deleted",
        }
    }
}

pub fn publish(tx: &broadcast::Sender<BookingEvent>, event: BookingEvent) {
    tracing::debug!(event = event.name(), "publishing booking event");
    // No subscribers is fine.
    let _ = tx.send(event);
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::errors::BookingError;
use crate::models::{
    Booking, BookingDraft, BookingFilter, BookingId, BookingStatus, OperatingWindow, StaffId,
    TimeSlot,
};
use crate::services::catalog::Catalog;
use crate::services::events::{self, BookingEvent};
use crate::services::validation::{self, Checked, SlotCheck, ValidationContext};
use crate::services::{availability, lifecycle};

const EVENT_CAPACITY: usize = 256;

/// Full persisted state of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSnapshot {
    pub next_id: BookingId,
    pub bookings: Vec<Booking>,
}

/// Durable backing for the store. `save` must be all-or-nothing.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<BookingSnapshot>>;
    fn save(&self, snapshot: &BookingSnapshot) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct Ledger {
    bookings: Vec<Booking>,
    next_id: BookingId,
}

impl Ledger {
    fn position(&self, id: BookingId) -> Option<usize> {
        self.bookings.iter().position(|b| b.id == id)
    }

    fn snapshot(&self) -> BookingSnapshot {
        BookingSnapshot {
            next_id: self.next_id,
            bookings: self.bookings.clone(),
        }
    }
}

impl From<BookingSnapshot> for Ledger {
    fn from(snapshot: BookingSnapshot) -> Self {
        let floor = snapshot.bookings.iter().map(|b| b.id + 1).max().unwrap_or(1);
        Self {
            next_id: snapshot.next_id.max(floor),
            bookings: snapshot.bookings,
        }
    }
}

/// Owner of all booking records.
///
/// Every mutation runs under one lock and is applied to a staged copy that
/// is persisted before it replaces the live ledger, so a rejected or failed
/// call leaves nothing behind. Reads hand out clones.
///
/// Change events are broadcast before the lock is released, so subscribers
/// see them in commit order.
pub struct BookingStore {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    window: OperatingWindow,
    snapshots: Option<Box<dyn SnapshotStore>>,
    events: broadcast::Sender<BookingEvent>,
    ledger: Mutex<Ledger>,
}

impl BookingStore {
    pub fn new(catalog: Arc<Catalog>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            clock,
            window: OperatingWindow::default(),
            snapshots: None,
            events,
            ledger: Mutex::new(Ledger {
                bookings: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Builds a store backed by `snapshots`, restoring whatever it holds.
    pub fn with_snapshots(
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        snapshots: Box<dyn SnapshotStore>,
    ) -> anyhow::Result<Self> {
        let restored = snapshots.load()?.unwrap_or(BookingSnapshot {
            next_id: 1,
            bookings: Vec::new(),
        });
        tracing::info!(
            bookings = restored.bookings.len(),
            next_id = restored.next_id,
            "restored booking snapshot"
        );

        let mut store = Self::new(catalog, clock);
        store.snapshots = Some(snapshots);
        store.ledger = Mutex::new(Ledger::from(restored));
        Ok(store)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn events(&self) -> broadcast::Sender<BookingEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context<'a>(&'a self, ledger: &'a Ledger, editing: Option<&'a Booking>) -> ValidationContext<'a> {
        ValidationContext {
            catalog: &self.catalog,
            bookings: &ledger.bookings,
            window: &self.window,
            now: self.clock.now(),
            editing,
        }
    }

    /// Persists `staged` and swaps it in. On failure the live ledger is kept.
    fn commit(&self, live: &mut Ledger, staged: Ledger) -> Result<(), BookingError> {
        if let Some(snapshots) = &self.snapshots {
            snapshots.save(&staged.snapshot()).map_err(|e| {
                tracing::error!(error = %e, "failed to persist booking snapshot");
                BookingError::Storage(e.to_string())
            })?;
        }
        *live = staged;
        Ok(())
    }

    // ── Reads ──

    pub fn list(&self, filter: &BookingFilter) -> Vec<Booking> {
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let ledger = self.lock();
        ledger
            .bookings
            .iter()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| match &needle {
                None => true,
                Some(needle) => self.matches_search(b, needle),
            })
            .cloned()
            .collect()
    }

    fn matches_search(&self, booking: &Booking, needle: &str) -> bool {
        let service_name = self
            .catalog
            .service(booking.service_id)
            .map(|s| s.name.to_lowercase())
            .unwrap_or_default();

        booking.customer_name.to_lowercase().contains(needle)
            || booking.customer_email.to_lowercase().contains(needle)
            || service_name.contains(needle)
    }

    pub fn get(&self, id: BookingId) -> Option<Booking> {
        let ledger = self.lock();
        ledger.bookings.iter().find(|b| b.id == id).cloned()
    }

    pub fn availability(&self, date: NaiveDate, staff_id: StaffId) -> Vec<TimeSlot> {
        let ledger = self.lock();
        availability::generate(
            &self.window,
            date,
            staff_id,
            &ledger.bookings,
            self.clock.now(),
            None,
        )
    }

    pub fn validate(&self, draft: &BookingDraft) -> crate::errors::FieldErrors {
        let ledger = self.lock();
        validation::validate(&self.context(&ledger, None), draft)
    }

    // ── Mutations ──

    pub fn create(&self, draft: BookingDraft) -> Result<Booking, BookingError> {
        let mut ledger = self.lock();

        let checked = validation::check(&self.context(&ledger, None), &draft);
        let status = reject_unless_clean(checked, &draft)?.unwrap_or(BookingStatus::Pending);

        let booking = Booking::from_draft(ledger.next_id, &draft, status);
        let mut staged = ledger.clone();
        staged.bookings.push(booking.clone());
        staged.next_id += 1;
        self.commit(&mut ledger, staged)?;

        tracing::info!(
            booking_id = booking.id,
            staff_id = booking.staff_id,
            status = %booking.status,
            scheduled_at = %booking.scheduled_at,
            "booking created"
        );
        events::publish(
            &self.events,
            BookingEvent::Created {
                booking: booking.clone(),
            },
        );
        Ok(booking)
    }

    /// Replaces every field but the id. A status change must be a legal
    /// lifecycle edge.
    pub fn update(&self, id: BookingId, draft: BookingDraft) -> Result<Booking, BookingError> {
        let mut ledger = self.lock();
        let index = ledger.position(id).ok_or(BookingError::NotFound(id))?;
        let prior = ledger.bookings[index].clone();

        let mut draft = draft;
        if draft.status.is_none() {
            draft.status = Some(prior.status.as_str().to_string());
        }

        let checked = validation::check(&self.context(&ledger, Some(&prior)), &draft);
        if !checked.errors.is_empty() {
            tracing::warn!(booking_id = id, errors = %checked.errors, "booking update rejected");
            return Err(BookingError::Validation(checked.into_field_errors()));
        }

        let status = checked.status.unwrap_or(prior.status);
        if status != prior.status {
            lifecycle::ensure_transition(prior.status, status)?;
        }

        let checked = Checked {
            status: Some(status),
            ..checked
        };
        reject_unless_clean(checked, &draft)?;

        let booking = Booking::from_draft(id, &draft, status);
        let mut staged = ledger.clone();
        staged.bookings[index] = booking.clone();
        self.commit(&mut ledger, staged)?;

        tracing::info!(booking_id = id, status = %booking.status, "booking updated");
        events::publish(
            &self.events,
            BookingEvent::Updated {
                booking: booking.clone(),
            },
        );
        Ok(booking)
    }

    /// Removes the record for good; deleting twice is an error.
    pub fn delete(&self, id: BookingId) -> Result<(), BookingError> {
        let mut ledger = self.lock();
        let index = ledger.position(id).ok_or(BookingError::NotFound(id))?;

        let mut staged = ledger.clone();
        staged.bookings.remove(index);
        self.commit(&mut ledger, staged)?;

        tracing::info!(booking_id = id, "booking deleted");
        events::publish(&self.events, BookingEvent::Deleted { id });
        Ok(())
    }

    pub fn transition(&self, id: BookingId, to: BookingStatus) -> Result<Booking, BookingError> {
        let mut ledger = self.lock();
        let index = ledger.position(id).ok_or(BookingError::NotFound(id))?;
        let from = ledger.bookings[index].status;

        if let Err(e) = lifecycle::ensure_transition(from, to) {
            tracing::warn!(booking_id = id, %from, %to, "illegal status transition");
            return Err(e);
        }

        let mut staged = ledger.clone();
        staged.bookings[index].status = to;
        let booking = staged.bookings[index].clone();
        self.commit(&mut ledger, staged)?;

        tracing::info!(booking_id = id, %from, %to, "booking status changed");
        events::publish(
            &self.events,
            BookingEvent::StatusChanged {
                booking: booking.clone(),
            },
        );
        Ok(booking)
    }
}

/// Turns a validation outcome into the caller-facing error, if any. Occupancy
/// alone is a conflict; anything else is a validation failure.
fn reject_unless_clean(
    checked: Checked,
    draft: &BookingDraft,
) -> Result<Option<BookingStatus>, BookingError> {
    if !checked.errors.is_empty() {
        tracing::warn!(errors = %checked.errors, "booking draft rejected");
        return Err(BookingError::Validation(checked.into_field_errors()));
    }
    if checked.slot == SlotCheck::Occupied {
        tracing::warn!(
            staff_id = draft.staff_id,
            scheduled_at = %draft.scheduled_at,
            "slot already booked"
        );
        return Err(BookingError::Conflict {
            staff_id: draft.staff_id,
            scheduled_at: draft.scheduled_at,
        });
    }
    Ok(checked.status)
}

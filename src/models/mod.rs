pub mod availability;
pub mod booking;
pub mod catalog;

pub use availability::{OperatingWindow, TimeSlot};
pub use booking::{Booking, BookingDraft, BookingFilter, BookingId, BookingStatus};
pub use catalog::{Service, ServiceId, Staff, StaffId};

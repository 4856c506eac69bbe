pub mod availability;
pub mod calendar;
pub mod catalog;
pub mod events;
pub mod lifecycle;
pub mod store;
pub mod validation;

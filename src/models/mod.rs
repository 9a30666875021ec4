//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod booking;

// Re-export commonly used models
pub use user::{User, Role, Caller, UserContact, CreateUserRequest};
pub use event::{Event, EventStatus, EventSummary, EventPatch, EventFilter, StatusFilter, NumberInput, CreateEventRequest, UpdateEventRequest, NewEvent, UpdatePlan, RejectionOutcome};
pub use booking::{Booking, BookingStatus, BookingWithEvent, ReminderEntry};

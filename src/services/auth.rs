//! Authorization service implementation
//!
//! Callers arrive already authenticated as a [`Caller`]; this service only
//! answers role and ownership questions about them.

use tracing::{debug, warn};
use crate::models::{Caller, Event, Booking};
use crate::utils::errors::{EventHubError, Result};

/// Permission levels for different operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create events, book and cancel own bookings
    User,
    /// Approve, reject, edit and delete any event
    Admin,
}

#[derive(Debug, Clone, Default)]
pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        Self
    }

    /// Permissions granted to a caller
    pub fn permissions(&self, caller: &Caller) -> Vec<Permission> {
        if caller.is_admin() {
            vec![Permission::User, Permission::Admin]
        } else {
            vec![Permission::User]
        }
    }

    pub fn has_permission(&self, caller: &Caller, permission: Permission) -> bool {
        self.permissions(caller).contains(&permission)
    }

    /// Fail unless the caller is an admin
    pub fn require_admin(&self, caller: &Caller, action: &str) -> Result<()> {
        if self.has_permission(caller, Permission::Admin) {
            debug!(user_id = caller.id, action = action, "Admin permission granted");
            return Ok(());
        }

        warn!(user_id = caller.id, action = action, "Admin permission denied");
        Err(EventHubError::PermissionDenied(format!("Admin access required to {}", action)))
    }

    /// Fail unless the caller created the event or is an admin
    pub fn require_owner_or_admin(&self, caller: &Caller, event: &Event, action: &str) -> Result<()> {
        if caller.is_admin() || event.is_owned_by(caller) {
            return Ok(());
        }

        warn!(user_id = caller.id, event_id = event.id, action = action, "Event permission denied");
        Err(EventHubError::PermissionDenied(format!("Not authorized to {} this event", action)))
    }

    /// Fail unless the caller holds the booking
    pub fn require_booking_owner(&self, caller: &Caller, booking: &Booking) -> Result<()> {
        if booking.user_id == caller.id {
            return Ok(());
        }

        warn!(user_id = caller.id, booking_id = booking.id, "Booking permission denied");
        Err(EventHubError::PermissionDenied("Not authorized to cancel this booking".to_string()))
    }
}

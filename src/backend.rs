use crate::error::BackendError;
use crate::types::{
    BookingDetails, Consultant, NewConsultant, NewRequestLog, NewSlot, NewUser, RequestLog, Slot,
    SlotDetails, User,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence seam shared by the HTTP layer and the booking coordinator.
pub trait BookingBackend: Clone + Send + Sync + 'static {
    fn add_user(&self, new_user: NewUser) -> Result<User, BackendError>;
    fn user_by_token(&self, token: &str) -> Result<Option<User>, BackendError>;
    fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<User, BackendError>;
    /// Removes the user together with everything it owns.
    fn remove_user(&self, id: Uuid) -> Result<(), BackendError>;

    fn consultants(&self) -> Result<Vec<Consultant>, BackendError>;
    fn add_consultant(&self, new_consultant: NewConsultant) -> Result<Consultant, BackendError>;
    fn remove_consultant(&self, id: Uuid) -> Result<(), BackendError>;

    fn add_slot(&self, new_slot: NewSlot) -> Result<Slot, BackendError>;
    fn remove_slot(&self, id: Uuid) -> Result<(), BackendError>;
    /// Unbooked slots starting at or after `now`, earliest first.
    fn available_slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotDetails>, BackendError>;

    /// Marks the slot as booked and records the booking in one atomic step.
    ///
    /// Fails with [`BackendError::SlotUnavailable`] without changing anything if
    /// the slot does not exist or is already booked.
    fn book_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        notes: String,
    ) -> Result<BookingDetails, BackendError>;
    fn bookings(&self) -> Result<Vec<BookingDetails>, BackendError>;

    fn record_request(&self, entry: NewRequestLog) -> Result<(), BackendError>;
    fn request_logs(&self, limit: usize) -> Result<Vec<RequestLog>, BackendError>;
}

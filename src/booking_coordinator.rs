//! Turns a booking request of an authenticated user into a booking.
//!
//! The check whether a slot is still free and the transition to booked happen
//! inside [`BookingBackend::book_slot`] as one atomic step. The coordinator never
//! reads the slot first and writes it afterwards.

use crate::{
    backend::BookingBackend,
    error::BackendError,
    types::{BookingDetails, User},
};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BookingCoordinator<T: BookingBackend> {
    backend: T,
}

impl<T: BookingBackend> BookingCoordinator<T> {
    pub fn new(backend: T) -> Self {
        Self { backend }
    }

    /// A missing or malformed `slot_id` is handled like a slot that does not exist.
    pub fn book(
        &self,
        slot_id: Option<&str>,
        requester: &User,
        notes: Option<String>,
    ) -> Result<BookingDetails, BackendError> {
        let Some(slot_id) = slot_id.and_then(|id| Uuid::parse_str(id.trim()).ok()) else {
            warn!(?slot_id, user = %requester, "Booking request without valid slot id");
            return Err(BackendError::SlotUnavailable);
        };

        match self
            .backend
            .book_slot(slot_id, requester.id, notes.unwrap_or_default())
        {
            Ok(booking) => {
                info!(%slot_id, booking_id = %booking.id, booker = %requester.display_name(), "Slot booked");
                Ok(booking)
            }
            Err(BackendError::SlotUnavailable) => {
                warn!(%slot_id, user = %requester, "Slot is not available");
                Err(BackendError::SlotUnavailable)
            }
            Err(err) => {
                error!(?err, %slot_id, "Booking failed");
                Err(err)
            }
        }
    }
}

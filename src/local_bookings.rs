use crate::{
    backend::BookingBackend,
    error::BackendError,
    types::{
        Booking, BookingDetails, Consultant, NewConsultant, NewRequestLog, NewSlot, NewUser,
        RequestLog, Slot, SlotDetails, User,
    },
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Store {
    users: HashMap<Uuid, User>,
    consultants: HashMap<Uuid, Consultant>,
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
    request_logs: Vec<RequestLog>,
}

impl Store {
    fn slot_details(&self, slot: &Slot) -> Result<SlotDetails, BackendError> {
        let consultant = self
            .consultants
            .get(&slot.consultant_id)
            .cloned()
            .ok_or(BackendError::NotFound("Consultant"))?;
        Ok(slot.clone().with_consultant(consultant))
    }

    fn booking_details(&self, booking: &Booking) -> Result<BookingDetails, BackendError> {
        let slot = self
            .slots
            .get(&booking.slot_id)
            .ok_or(BackendError::NotFound("Slot"))?;
        Ok(booking.clone().with_slot(self.slot_details(slot)?))
    }

    fn remove_slot(&mut self, id: Uuid) -> bool {
        self.bookings.retain(|_, booking| booking.slot_id != id);
        self.slots.remove(&id).is_some()
    }

    fn remove_consultant(&mut self, id: Uuid) -> bool {
        let slot_ids: Vec<Uuid> = self
            .slots
            .values()
            .filter(|slot| slot.consultant_id == id)
            .map(|slot| slot.id)
            .collect();
        for slot_id in slot_ids {
            self.remove_slot(slot_id);
        }
        self.consultants.remove(&id).is_some()
    }
}

/// In-memory backend used when no database is configured. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct LocalBookings {
    store: Arc<Mutex<Store>>,
}

impl LocalBookings {
    fn store(&self) -> Result<MutexGuard<'_, Store>, BackendError> {
        self.store.lock().map_err(|_| {
            error!("Local booking store lock was poisoned");
            BackendError::LockPoisoned
        })
    }
}

impl BookingBackend for LocalBookings {
    fn add_user(&self, new_user: NewUser) -> Result<User, BackendError> {
        let mut store = self.store()?;
        if store
            .users
            .values()
            .any(|user| user.username == new_user.username)
        {
            return Err(BackendError::Conflict(format!(
                "Username '{}' is already taken",
                new_user.username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            role: new_user.role,
            phone: new_user.phone,
            api_token: Uuid::new_v4().simple().to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>, BackendError> {
        Ok(self
            .store()?
            .users
            .values()
            .find(|user| user.api_token == token)
            .cloned())
    }

    fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<User, BackendError> {
        let mut store = self.store()?;
        let user = store
            .users
            .get_mut(&id)
            .ok_or(BackendError::NotFound("User"))?;
        user.is_active = is_active;
        Ok(user.clone())
    }

    fn remove_user(&self, id: Uuid) -> Result<(), BackendError> {
        let mut store = self.store()?;
        if store.users.remove(&id).is_none() {
            return Err(BackendError::NotFound("User"));
        }

        let consultant_ids: Vec<Uuid> = store
            .consultants
            .values()
            .filter(|consultant| consultant.user_id == id)
            .map(|consultant| consultant.id)
            .collect();
        for consultant_id in consultant_ids {
            store.remove_consultant(consultant_id);
        }
        store.bookings.retain(|_, booking| booking.user_id != id);
        for entry in store.request_logs.iter_mut() {
            if entry.user_id == Some(id) {
                entry.user_id = None;
            }
        }
        Ok(())
    }

    fn consultants(&self) -> Result<Vec<Consultant>, BackendError> {
        Ok(self.store()?.consultants.values().cloned().collect())
    }

    fn add_consultant(&self, new_consultant: NewConsultant) -> Result<Consultant, BackendError> {
        let mut store = self.store()?;
        if !store.users.contains_key(&new_consultant.user_id) {
            return Err(BackendError::NotFound("User"));
        }
        if store
            .consultants
            .values()
            .any(|consultant| consultant.user_id == new_consultant.user_id)
        {
            return Err(BackendError::Conflict(
                "User is already a consultant".into(),
            ));
        }

        let consultant = Consultant {
            id: Uuid::new_v4(),
            user_id: new_consultant.user_id,
            bio: new_consultant.bio,
            expertise: new_consultant.expertise,
        };
        store.consultants.insert(consultant.id, consultant.clone());
        Ok(consultant)
    }

    fn remove_consultant(&self, id: Uuid) -> Result<(), BackendError> {
        if !self.store()?.remove_consultant(id) {
            return Err(BackendError::NotFound("Consultant"));
        }
        Ok(())
    }

    fn add_slot(&self, new_slot: NewSlot) -> Result<Slot, BackendError> {
        new_slot.check()?;
        let mut store = self.store()?;
        if !store.consultants.contains_key(&new_slot.consultant_id) {
            return Err(BackendError::NotFound("Consultant"));
        }

        let slot = Slot {
            id: Uuid::new_v4(),
            consultant_id: new_slot.consultant_id,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            is_booked: false,
        };
        store.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    fn remove_slot(&self, id: Uuid) -> Result<(), BackendError> {
        if !self.store()?.remove_slot(id) {
            return Err(BackendError::NotFound("Slot"));
        }
        Ok(())
    }

    fn available_slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotDetails>, BackendError> {
        let store = self.store()?;
        let mut slots = store
            .slots
            .values()
            .filter(|slot| !slot.is_booked && slot.start_time >= now)
            .map(|slot| store.slot_details(slot))
            .collect::<Result<Vec<_>, _>>()?;
        slots.sort_unstable_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(slots)
    }

    fn book_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        notes: String,
    ) -> Result<BookingDetails, BackendError> {
        let mut store = self.store()?;
        if !store.users.contains_key(&user_id) {
            return Err(BackendError::NotFound("User"));
        }

        let slot = match store.slots.get(&slot_id) {
            Some(slot) if !slot.is_booked => slot,
            _ => return Err(BackendError::SlotUnavailable),
        };
        let mut slot = store.slot_details(slot)?;
        slot.is_booked = true;

        let booking = Booking {
            id: Uuid::new_v4(),
            slot_id,
            user_id,
            booked_at: Utc::now(),
            notes,
        };
        if let Some(stored_slot) = store.slots.get_mut(&slot_id) {
            stored_slot.is_booked = true;
        }
        store.bookings.insert(booking.id, booking.clone());
        Ok(booking.with_slot(slot))
    }

    fn bookings(&self) -> Result<Vec<BookingDetails>, BackendError> {
        let store = self.store()?;
        let mut bookings = store
            .bookings
            .values()
            .map(|booking| store.booking_details(booking))
            .collect::<Result<Vec<_>, _>>()?;
        bookings.sort_unstable_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(bookings)
    }

    fn record_request(&self, entry: NewRequestLog) -> Result<(), BackendError> {
        self.store()?.request_logs.push(entry.into_request_log());
        Ok(())
    }

    fn request_logs(&self, limit: usize) -> Result<Vec<RequestLog>, BackendError> {
        Ok(self
            .store()?
            .request_logs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

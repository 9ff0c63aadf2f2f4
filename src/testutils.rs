use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    backend::BookingBackend,
    configuration::Configuration,
    error::BackendError,
    http::create_app,
    types::{
        Booking, BookingDetails, Consultant, NewConsultant, NewRequestLog, NewSlot, NewUser,
        RequestLog, Role, Slot, SlotDetails, User,
    },
};

pub const TEST_ADMIN_PASSWORD: &str = "123";
pub const VALID_TOKEN: &str = "valid-token";

#[derive(Clone)]
pub struct TestConfiguration;

impl Configuration for TestConfiguration {
    fn port(&self) -> u16 {
        0
    }

    fn admin_password(&self) -> String {
        TEST_ADMIN_PASSWORD.into()
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn request_log_body_limit(&self) -> usize {
        16 * 1024
    }
}

/// Serves the router on an ephemeral port and returns the base url.
pub async fn spawn_app<T: BookingBackend>(backend: T) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let app = create_app(backend, TestConfiguration);

    let server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (server, format!("http://{address}"))
}

pub fn example_user<T: BookingBackend>(backend: &T, username: &str) -> User {
    backend
        .add_user(NewUser {
            username: username.into(),
            role: Role::Client,
            ..NewUser::default()
        })
        .unwrap()
}

pub fn example_consultant<T: BookingBackend>(backend: &T) -> Consultant {
    let user = example_user(backend, &format!("consultant_{}", Uuid::new_v4().simple()));
    backend
        .add_consultant(NewConsultant {
            user_id: user.id,
            bio: "Consultant for test purposes".into(),
            expertise: "Testing".into(),
        })
        .unwrap()
}

pub struct MockBookingBackendInner {
    pub success: AtomicBool,
    pub calls_to_add_user: AtomicU64,
    pub calls_to_user_by_token: AtomicU64,
    pub calls_to_set_user_active: AtomicU64,
    pub calls_to_remove_user: AtomicU64,
    pub calls_to_consultants: AtomicU64,
    pub calls_to_add_consultant: AtomicU64,
    pub calls_to_remove_consultant: AtomicU64,
    pub calls_to_add_slot: AtomicU64,
    pub calls_to_remove_slot: AtomicU64,
    pub calls_to_available_slots: AtomicU64,
    pub calls_to_book_slot: AtomicU64,
    pub calls_to_bookings: AtomicU64,
    pub calls_to_record_request: AtomicU64,
    pub calls_to_request_logs: AtomicU64,
    pub user: User,
}

#[derive(Clone)]
pub struct MockBookingBackend(pub Arc<MockBookingBackendInner>);

impl MockBookingBackendInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            calls_to_add_user: AtomicU64::default(),
            calls_to_user_by_token: AtomicU64::default(),
            calls_to_set_user_active: AtomicU64::default(),
            calls_to_remove_user: AtomicU64::default(),
            calls_to_consultants: AtomicU64::default(),
            calls_to_add_consultant: AtomicU64::default(),
            calls_to_remove_consultant: AtomicU64::default(),
            calls_to_add_slot: AtomicU64::default(),
            calls_to_remove_slot: AtomicU64::default(),
            calls_to_available_slots: AtomicU64::default(),
            calls_to_book_slot: AtomicU64::default(),
            calls_to_bookings: AtomicU64::default(),
            calls_to_record_request: AtomicU64::default(),
            calls_to_request_logs: AtomicU64::default(),
            user: User {
                id: Uuid::new_v4(),
                username: "stefan".into(),
                first_name: "Stefan".into(),
                last_name: String::new(),
                email: String::new(),
                role: Role::Client,
                phone: String::new(),
                api_token: VALID_TOKEN.into(),
                is_active: true,
                date_joined: Utc::now(),
            },
        }
    }
}

impl MockBookingBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockBookingBackendInner::new()))
    }

    /// The user authenticated by [`VALID_TOKEN`].
    pub fn user(&self) -> User {
        self.0.user.clone()
    }

    /// Number of backend calls caused by a request to `path`.
    pub fn calls(&self, path: &str) -> u64 {
        let counter = match path {
            "book" => &self.0.calls_to_book_slot,
            "slots" => &self.0.calls_to_available_slots,
            "consultants" => &self.0.calls_to_consultants,
            "admin/users" => &self.0.calls_to_add_user,
            "admin/users/active" => &self.0.calls_to_set_user_active,
            "admin/users/remove" => &self.0.calls_to_remove_user,
            "admin/consultants" => &self.0.calls_to_add_consultant,
            "admin/consultants/remove" => &self.0.calls_to_remove_consultant,
            "admin/slots" => &self.0.calls_to_add_slot,
            "admin/slots/remove" => &self.0.calls_to_remove_slot,
            "admin/bookings" => &self.0.calls_to_bookings,
            "admin/request_logs" => &self.0.calls_to_request_logs,
            _ => unimplemented!(),
        };
        counter.load(Ordering::SeqCst)
    }

    fn result(&self) -> Result<(), BackendError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BackendError::NotFound("Supposed to fail")),
        }
    }

    fn consultant(&self) -> Consultant {
        Consultant {
            id: Uuid::new_v4(),
            user_id: self.0.user.id,
            bio: String::new(),
            expertise: "Mocking".into(),
        }
    }

    fn slot(&self, id: Uuid, start_time: DateTime<Utc>, is_booked: bool) -> Slot {
        Slot {
            id,
            consultant_id: Uuid::new_v4(),
            start_time,
            end_time: start_time + Duration::hours(1),
            is_booked,
        }
    }
}

impl BookingBackend for MockBookingBackend {
    fn add_user(&self, new_user: NewUser) -> Result<User, BackendError> {
        self.0.calls_to_add_user.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(User {
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
        })
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>, BackendError> {
        self.0.calls_to_user_by_token.fetch_add(1, Ordering::SeqCst);
        Ok((token == VALID_TOKEN).then(|| self.user()))
    }

    fn set_user_active(&self, _id: Uuid, is_active: bool) -> Result<User, BackendError> {
        self.0.calls_to_set_user_active.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(User {
            is_active,
            ..self.user()
        })
    }

    fn remove_user(&self, _id: Uuid) -> Result<(), BackendError> {
        self.0.calls_to_remove_user.fetch_add(1, Ordering::SeqCst);
        self.result()
    }

    fn consultants(&self) -> Result<Vec<Consultant>, BackendError> {
        self.0.calls_to_consultants.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.consultant()])
    }

    fn add_consultant(&self, new_consultant: NewConsultant) -> Result<Consultant, BackendError> {
        self.0.calls_to_add_consultant.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Consultant {
            id: Uuid::new_v4(),
            user_id: new_consultant.user_id,
            bio: new_consultant.bio,
            expertise: new_consultant.expertise,
        })
    }

    fn remove_consultant(&self, _id: Uuid) -> Result<(), BackendError> {
        self.0
            .calls_to_remove_consultant
            .fetch_add(1, Ordering::SeqCst);
        self.result()
    }

    fn add_slot(&self, new_slot: NewSlot) -> Result<Slot, BackendError> {
        self.0.calls_to_add_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Slot {
            id: Uuid::new_v4(),
            consultant_id: new_slot.consultant_id,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            is_booked: false,
        })
    }

    fn remove_slot(&self, _id: Uuid) -> Result<(), BackendError> {
        self.0.calls_to_remove_slot.fetch_add(1, Ordering::SeqCst);
        self.result()
    }

    fn available_slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotDetails>, BackendError> {
        self.0
            .calls_to_available_slots
            .fetch_add(1, Ordering::SeqCst);
        if !self.0.success.load(Ordering::SeqCst) {
            return Err(BackendError::LockPoisoned);
        }
        let slot = self.slot(Uuid::new_v4(), now + Duration::hours(1), false);
        Ok(vec![slot.with_consultant(self.consultant())])
    }

    fn book_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        notes: String,
    ) -> Result<BookingDetails, BackendError> {
        self.0.calls_to_book_slot.fetch_add(1, Ordering::SeqCst);
        if !self.0.success.load(Ordering::SeqCst) {
            return Err(BackendError::SlotUnavailable);
        }
        let slot = self
            .slot(slot_id, Utc::now() + Duration::hours(1), true)
            .with_consultant(self.consultant());
        let booking = Booking {
            id: Uuid::new_v4(),
            slot_id,
            user_id,
            booked_at: Utc::now(),
            notes,
        };
        Ok(booking.with_slot(slot))
    }

    fn bookings(&self) -> Result<Vec<BookingDetails>, BackendError> {
        self.0.calls_to_bookings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }

    fn record_request(&self, _entry: NewRequestLog) -> Result<(), BackendError> {
        self.0.calls_to_record_request.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn request_logs(&self, _limit: usize) -> Result<Vec<RequestLog>, BackendError> {
        self.0.calls_to_request_logs.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }
}

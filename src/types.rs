use crate::error::BackendError;
use crate::schema::{bookings, consultancy_slots, consultants, request_logs};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 -]*$").unwrap();
}

pub const MAX_PHONE_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BackendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "student" => Ok(Role::Student),
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            other => Err(BackendError::Invalid(format!("Unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    #[serde(skip)]
    pub api_token: String,
    /// Inactive users keep their data but can no longer authenticate.
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "first last" if any part of the name is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full_name = format!("{} {}", self.first_name, self.last_name);
        let full_name = full_name.trim();
        if full_name.is_empty() {
            self.username.clone()
        } else {
            full_name.to_string()
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
}

impl NewUser {
    pub fn check(&self) -> Result<(), BackendError> {
        if !USERNAME_REGEX.is_match(&self.username) {
            return Err(BackendError::Invalid(
                "Username may only contain letters, digits and @/./+/-/_".into(),
            ));
        }
        check_phone(&self.phone)
    }
}

pub fn check_phone(phone: &str) -> Result<(), BackendError> {
    if phone.is_empty() {
        return Ok(());
    }
    if phone.chars().count() > MAX_PHONE_LENGTH || !PHONE_REGEX.is_match(phone) {
        return Err(BackendError::Invalid(format!(
            "Phone number must be at most {MAX_PHONE_LENGTH} digits, spaces or dashes"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = consultants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Consultant {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub bio: String,
    pub expertise: String,
}

#[derive(Debug, Clone)]
pub struct NewConsultant {
    pub user_id: Uuid,
    pub bio: String,
    pub expertise: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = consultancy_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Slot {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
}

impl Slot {
    pub fn with_consultant(self, consultant: Consultant) -> SlotDetails {
        SlotDetails {
            id: self.id,
            consultant,
            start_time: self.start_time,
            end_time: self.end_time,
            is_booked: self.is_booked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub consultant_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewSlot {
    pub fn check(&self) -> Result<(), BackendError> {
        if self.end_time <= self.start_time {
            return Err(BackendError::Invalid(
                "Slot must end after it starts".into(),
            ));
        }
        Ok(())
    }
}

/// A slot as presented to clients, with its consultant embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDetails {
    pub id: Uuid,
    pub consultant: Consultant,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub user_id: Uuid,
    pub booked_at: DateTime<Utc>,
    pub notes: String,
}

impl Booking {
    pub fn with_slot(self, slot: SlotDetails) -> BookingDetails {
        BookingDetails {
            id: self.id,
            slot,
            user_id: self.user_id,
            booked_at: self.booked_at,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub id: Uuid,
    pub slot: SlotDetails,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub booked_at: DateTime<Utc>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = request_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RequestLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub path: String,
    pub method: String,
    pub logged_at: DateTime<Utc>,
    pub remote_addr: Option<String>,
    pub query_params: String,
    pub body: String,
}

impl fmt::Display for RequestLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.method, self.path, self.logged_at)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewRequestLog {
    pub user_id: Option<Uuid>,
    pub path: String,
    pub method: String,
    pub remote_addr: Option<String>,
    pub query_params: String,
    pub body: String,
}

impl NewRequestLog {
    pub fn into_request_log(self) -> RequestLog {
        RequestLog {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            path: self.path,
            method: self.method,
            logged_at: Utc::now(),
            remote_addr: self.remote_addr,
            query_params: self.query_params,
            body: self.body,
        }
    }
}

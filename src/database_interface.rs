use crate::backend::BookingBackend;
use crate::error::BackendError;
use crate::schema::{bookings, consultancy_slots, consultants, request_logs, users};
use crate::types::{
    Booking, BookingDetails, Consultant, NewConsultant, NewRequestLog, NewSlot, NewUser,
    RequestLog, Slot, SlotDetails, User,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ConnectionError, PgConnection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;
use uuid::Uuid;

/// Row layout of `users`. The role is stored as plain text.
#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct UserRow {
    id: Uuid,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    role: String,
    phone: String,
    api_token: String,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = BackendError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            role: row.role.parse()?,
            phone: row.phone,
            api_token: row.api_token,
            is_active: row.is_active,
            date_joined: row.date_joined,
        })
    }
}

fn is_unique_violation(err: &BackendError) -> bool {
    matches!(
        err,
        BackendError::Database(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            _
        ))
    )
}

fn is_foreign_key_violation(err: &BackendError) -> bool {
    matches!(
        err,
        BackendError::Database(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            _
        ))
    )
}

#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, ConnectionError> {
        let connection = Self::establish_connection(database_url)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(database_url: &str) -> Result<PgConnection, ConnectionError> {
        PgConnection::establish(database_url)
    }

    fn connection(&self) -> Result<MutexGuard<'_, PgConnection>, BackendError> {
        self.connection.lock().map_err(|_| {
            error!("Database connection lock was poisoned");
            BackendError::LockPoisoned
        })
    }

    fn delete_checked(affected_rows: usize, entity: &'static str) -> Result<(), BackendError> {
        match affected_rows {
            0 => Err(BackendError::NotFound(entity)),
            _ => Ok(()),
        }
    }
}

impl BookingBackend for DatabaseInterface {
    fn add_user(&self, new_user: NewUser) -> Result<User, BackendError> {
        let row = UserRow {
            id: Uuid::new_v4(),
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            role: new_user.role.to_string(),
            phone: new_user.phone,
            api_token: Uuid::new_v4().simple().to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };

        let mut connection = self.connection()?;
        let row = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut *connection)
            .map_err(BackendError::from)
            .map_err(|err| {
                if is_unique_violation(&err) {
                    BackendError::Conflict("Username is already taken".into())
                } else {
                    err
                }
            })?;
        row.try_into()
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>, BackendError> {
        let mut connection = self.connection()?;
        users::table
            .filter(users::api_token.eq(token))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut *connection)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn remove_user(&self, id: Uuid) -> Result<(), BackendError> {
        let mut connection = self.connection()?;
        let affected_rows = diesel::delete(users::table.find(id)).execute(&mut *connection)?;
        Self::delete_checked(affected_rows, "User")
    }

    fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<User, BackendError> {
        let mut connection = self.connection()?;
        diesel::update(users::table.find(id))
            .set(users::is_active.eq(is_active))
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut *connection)
            .optional()?
            .ok_or(BackendError::NotFound("User"))?
            .try_into()
    }

    fn consultants(&self) -> Result<Vec<Consultant>, BackendError> {
        let mut connection = self.connection()?;
        Ok(consultants::table
            .select(Consultant::as_select())
            .load(&mut *connection)?)
    }

    fn add_consultant(&self, new_consultant: NewConsultant) -> Result<Consultant, BackendError> {
        let consultant = Consultant {
            id: Uuid::new_v4(),
            user_id: new_consultant.user_id,
            bio: new_consultant.bio,
            expertise: new_consultant.expertise,
        };

        let mut connection = self.connection()?;
        diesel::insert_into(consultants::table)
            .values(&consultant)
            .execute(&mut *connection)
            .map_err(BackendError::from)
            .map_err(|err| {
                if is_unique_violation(&err) {
                    BackendError::Conflict("User is already a consultant".into())
                } else if is_foreign_key_violation(&err) {
                    BackendError::NotFound("User")
                } else {
                    err
                }
            })?;
        Ok(consultant)
    }

    fn remove_consultant(&self, id: Uuid) -> Result<(), BackendError> {
        let mut connection = self.connection()?;
        let affected_rows =
            diesel::delete(consultants::table.find(id)).execute(&mut *connection)?;
        Self::delete_checked(affected_rows, "Consultant")
    }

    fn add_slot(&self, new_slot: NewSlot) -> Result<Slot, BackendError> {
        new_slot.check()?;
        let slot = Slot {
            id: Uuid::new_v4(),
            consultant_id: new_slot.consultant_id,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            is_booked: false,
        };

        let mut connection = self.connection()?;
        diesel::insert_into(consultancy_slots::table)
            .values(&slot)
            .execute(&mut *connection)
            .map_err(BackendError::from)
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    BackendError::NotFound("Consultant")
                } else {
                    err
                }
            })?;
        Ok(slot)
    }

    fn remove_slot(&self, id: Uuid) -> Result<(), BackendError> {
        let mut connection = self.connection()?;
        let affected_rows =
            diesel::delete(consultancy_slots::table.find(id)).execute(&mut *connection)?;
        Self::delete_checked(affected_rows, "Slot")
    }

    fn available_slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotDetails>, BackendError> {
        let mut connection = self.connection()?;
        let slots = consultancy_slots::table
            .inner_join(consultants::table)
            .filter(consultancy_slots::is_booked.eq(false))
            .filter(consultancy_slots::start_time.ge(now))
            .order(consultancy_slots::start_time.asc())
            .select((Slot::as_select(), Consultant::as_select()))
            .load::<(Slot, Consultant)>(&mut *connection)?;

        Ok(slots
            .into_iter()
            .map(|(slot, consultant)| slot.with_consultant(consultant))
            .collect())
    }

    fn book_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        notes: String,
    ) -> Result<BookingDetails, BackendError> {
        let mut connection = self.connection()?;
        connection
            .transaction::<_, BackendError, _>(|connection| {
                // Claiming the slot and checking its availability is one statement.
                let slot = diesel::update(
                    consultancy_slots::table
                        .filter(consultancy_slots::id.eq(slot_id))
                        .filter(consultancy_slots::is_booked.eq(false)),
                )
                .set(consultancy_slots::is_booked.eq(true))
                .returning(Slot::as_returning())
                .get_result::<Slot>(connection)
                .optional()?
                .ok_or(BackendError::SlotUnavailable)?;

                let booking = Booking {
                    id: Uuid::new_v4(),
                    slot_id,
                    user_id,
                    booked_at: Utc::now(),
                    notes,
                };
                diesel::insert_into(bookings::table)
                    .values(&booking)
                    .execute(connection)
                    .map_err(BackendError::from)
                    .map_err(|err| {
                        if is_foreign_key_violation(&err) {
                            BackendError::NotFound("User")
                        } else {
                            err
                        }
                    })?;

                let consultant = consultants::table
                    .find(slot.consultant_id)
                    .select(Consultant::as_select())
                    .first::<Consultant>(connection)?;
                Ok(booking.with_slot(slot.with_consultant(consultant)))
            })
            .map_err(|err| {
                if is_unique_violation(&err) {
                    BackendError::SlotUnavailable
                } else {
                    err
                }
            })
    }

    fn bookings(&self) -> Result<Vec<BookingDetails>, BackendError> {
        let mut connection = self.connection()?;
        let bookings = bookings::table
            .inner_join(consultancy_slots::table.inner_join(consultants::table))
            .order(bookings::booked_at.desc())
            .select((
                Booking::as_select(),
                Slot::as_select(),
                Consultant::as_select(),
            ))
            .load::<(Booking, Slot, Consultant)>(&mut *connection)?;

        Ok(bookings
            .into_iter()
            .map(|(booking, slot, consultant)| booking.with_slot(slot.with_consultant(consultant)))
            .collect())
    }

    fn record_request(&self, entry: NewRequestLog) -> Result<(), BackendError> {
        let mut connection = self.connection()?;
        diesel::insert_into(request_logs::table)
            .values(&entry.into_request_log())
            .execute(&mut *connection)?;
        Ok(())
    }

    fn request_logs(&self, limit: usize) -> Result<Vec<RequestLog>, BackendError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut connection = self.connection()?;
        Ok(request_logs::table
            .order(request_logs::logged_at.desc())
            .limit(limit)
            .select(RequestLog::as_select())
            .load(&mut *connection)?)
    }
}

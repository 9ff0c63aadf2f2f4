use crate::authentication::{admin_auth, AuthenticatedUser};
use crate::backend::BookingBackend;
use crate::booking_coordinator::BookingCoordinator;
use crate::configuration::Configuration;
use crate::error::BackendError;
use crate::request_log::log_request;
use crate::types::{
    BookingDetails, Consultant, NewConsultant, NewSlot, NewUser, RequestLog, Role, Slot,
    SlotDetails, User,
};
use axum::extract::Query;
use axum::middleware;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_REQUEST_LOG_LIMIT: usize = 100;
const MAX_REQUEST_LOG_LIMIT: usize = 1000;

#[derive(Clone)]
pub struct AppState<T: BookingBackend, C: Configuration> {
    pub backend: T,
    pub booking_coordinator: BookingCoordinator<T>,
    pub configuration: C,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookingRequest {
    #[serde(default)]
    pub slot_id: Option<Value>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddConsultantRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub bio: String,
    #[validate(length(min = 1, max = 255))]
    pub expertise: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSlotRequest {
    pub consultant_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetUserActiveRequest {
    pub id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestLogQuery {
    limit: Option<usize>,
}

pub fn create_app<T: BookingBackend, C: Configuration>(backend: T, configuration: C) -> Router {
    let state = AppState {
        booking_coordinator: BookingCoordinator::new(backend.clone()),
        backend,
        configuration,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/consultants/", get(get_consultants::<T, C>))
        .route("/slots/", get(get_available_slots::<T, C>))
        .route("/book/", post(book_slot::<T, C>));

    let admin = Router::new()
        .route("/admin/users", post(add_user::<T, C>))
        .route("/admin/users/active", post(set_user_active::<T, C>))
        .route("/admin/users/remove", post(remove_user::<T, C>))
        .route("/admin/consultants", post(add_consultant::<T, C>))
        .route("/admin/consultants/remove", post(remove_consultant::<T, C>))
        .route("/admin/slots", post(add_slot::<T, C>))
        .route("/admin/slots/remove", post(remove_slot::<T, C>))
        .route("/admin/bookings", get(get_bookings::<T, C>))
        .route("/admin/request_logs", get(get_request_logs::<T, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<T, C>,
        ));

    // The log layer is outermost so CORS preflights are audited too.
    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state.clone())
        .layer(cors)
        .layer(middleware::from_fn_with_state(state, log_request::<T, C>))
}

async fn get_consultants<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
) -> Result<Json<Vec<Consultant>>, BackendError> {
    Ok(Json(state.backend.consultants()?))
}

async fn get_available_slots<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
) -> Result<Json<Vec<SlotDetails>>, BackendError> {
    Ok(Json(state.backend.available_slots(Utc::now())?))
}

async fn book_slot<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(booking): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>), BackendError> {
    booking.validate()?;
    let slot_id = booking.slot_id.as_ref().map(|id| match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    });

    let booking = state
        .booking_coordinator
        .book(slot_id.as_deref(), &user, booking.notes)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn add_user<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(user): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), BackendError> {
    user.validate()?;
    let new_user = NewUser {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email.unwrap_or_default(),
        role: user.role,
        phone: user.phone,
    };
    new_user.check()?;

    let user = state.backend.add_user(new_user)?;
    let token = user.api_token.clone();
    Ok((StatusCode::CREATED, Json(CreatedUserResponse { user, token })))
}

async fn set_user_active<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(request): Json<SetUserActiveRequest>,
) -> Result<Json<User>, BackendError> {
    Ok(Json(
        state.backend.set_user_active(request.id, request.is_active)?,
    ))
}

async fn remove_user<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(user): Json<RemoveRequest>,
) -> Result<impl IntoResponse, BackendError> {
    state.backend.remove_user(user.id)?;
    Ok((StatusCode::OK, "User removed successfully".to_string()))
}

async fn add_consultant<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(consultant): Json<AddConsultantRequest>,
) -> Result<(StatusCode, Json<Consultant>), BackendError> {
    consultant.validate()?;
    let consultant = state.backend.add_consultant(NewConsultant {
        user_id: consultant.user_id,
        bio: consultant.bio,
        expertise: consultant.expertise,
    })?;
    Ok((StatusCode::CREATED, Json(consultant)))
}

async fn remove_consultant<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(consultant): Json<RemoveRequest>,
) -> Result<impl IntoResponse, BackendError> {
    state.backend.remove_consultant(consultant.id)?;
    Ok((StatusCode::OK, "Consultant removed successfully".to_string()))
}

async fn add_slot<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(slot): Json<AddSlotRequest>,
) -> Result<(StatusCode, Json<Slot>), BackendError> {
    let new_slot = NewSlot {
        consultant_id: slot.consultant_id,
        start_time: slot.start_time,
        end_time: slot.end_time,
    };
    new_slot.check()?;

    let slot = state.backend.add_slot(new_slot)?;
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn remove_slot<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Json(slot): Json<RemoveRequest>,
) -> Result<impl IntoResponse, BackendError> {
    state.backend.remove_slot(slot.id)?;
    Ok((StatusCode::OK, "Slot removed successfully".to_string()))
}

async fn get_bookings<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
) -> Result<Json<Vec<BookingDetails>>, BackendError> {
    Ok(Json(state.backend.bookings()?))
}

async fn get_request_logs<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Query(query): Query<RequestLogQuery>,
) -> Result<Json<Vec<RequestLog>>, BackendError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_REQUEST_LOG_LIMIT)
        .min(MAX_REQUEST_LOG_LIMIT);
    Ok(Json(state.backend.request_logs(limit)?))
}

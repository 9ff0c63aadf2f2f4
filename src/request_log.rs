//! Audit trail: every request that reaches the router is written to the request log.

use crate::{
    authentication::api_token, backend::BookingBackend, configuration::Configuration,
    http::AppState, types::NewRequestLog,
};
use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use std::{error::Error as StdError, net::SocketAddr, time::Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_PATH_LENGTH: usize = 512;
const MAX_METHOD_LENGTH: usize = 10;

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn records_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn exceeds_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err as &(dyn StdError + 'static));
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn requesting_user<T: BookingBackend>(backend: &T, parts: &Parts) -> Option<Uuid> {
    let token = api_token(&parts.headers)?;
    match backend.user_by_token(token) {
        Ok(user) => user.map(|user| user.id),
        Err(err) => {
            warn!(?err, "Failed to resolve user for request log");
            None
        }
    }
}

pub async fn log_request<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let (body, recorded_body) = if records_body(&parts.method) {
        match to_bytes(body, state.configuration.request_log_body_limit()).await {
            Ok(bytes) => {
                let recorded_body = String::from_utf8_lossy(&bytes).into_owned();
                (Ok(Body::from(bytes)), recorded_body)
            }
            Err(err) if exceeds_length_limit(&err) => {
                warn!(path = %parts.uri.path(), "Request body exceeds the configured limit");
                let response =
                    (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
                (Err(response), String::new())
            }
            Err(err) => {
                warn!(?err, path = %parts.uri.path(), "Request body could not be read");
                let response =
                    (StatusCode::BAD_REQUEST, "Request body could not be read").into_response();
                (Err(response), String::new())
            }
        }
    } else {
        (Ok(body), String::new())
    };

    let entry = NewRequestLog {
        user_id: requesting_user(&state.backend, &parts),
        path: truncate(parts.uri.path(), MAX_PATH_LENGTH),
        method: truncate(parts.method.as_str(), MAX_METHOD_LENGTH),
        remote_addr: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip().to_string()),
        query_params: parts.uri.query().unwrap_or_default().to_owned(),
        body: recorded_body,
    };
    if let Err(err) = state.backend.record_request(entry) {
        error!(?err, "Failed to write request log");
    }

    let body = match body {
        Ok(body) => body,
        Err(response) => return response,
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();
    let response = next.run(Request::from_parts(parts, body)).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "HTTP request"
    );
    response
}

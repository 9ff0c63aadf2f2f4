use crate::{backend::BookingBackend, configuration::Configuration, http::AppState, types::User};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";
const TOKEN_PREFIX: &str = "Token ";

/// Extracts the API token from an `Authorization: Token <token>` header.
pub fn api_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(TOKEN_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub enum AuthenticationError {
    MissingCredentials,
    InvalidToken,
    InactiveUser,
    Backend(crate::error::BackendError),
}

impl IntoResponse for AuthenticationError {
    fn into_response(self) -> Response {
        let detail = match self {
            Self::MissingCredentials => "Authentication credentials were not provided.",
            Self::InvalidToken => "Invalid token.",
            Self::InactiveUser => "User inactive or deleted.",
            Self::Backend(err) => return err.into_response(),
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
    }
}

/// The caller of a request, resolved from its API token.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<T, C> FromRequestParts<AppState<T, C>> for AuthenticatedUser
where
    T: BookingBackend,
    C: Configuration,
{
    type Rejection = AuthenticationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<T, C>,
    ) -> Result<Self, Self::Rejection> {
        let token = api_token(&parts.headers).ok_or(AuthenticationError::MissingCredentials)?;
        match state.backend.user_by_token(token) {
            Ok(Some(user)) if user.is_active => Ok(Self(user)),
            Ok(Some(user)) => {
                warn!(user = %user, "Request by inactive user");
                Err(AuthenticationError::InactiveUser)
            }
            Ok(None) => {
                warn!(path = %parts.uri.path(), "Request with unknown API token");
                Err(AuthenticationError::InvalidToken)
            }
            Err(err) => Err(AuthenticationError::Backend(err)),
        }
    }
}

pub async fn admin_auth<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let password = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .map(|value| value.to_str().unwrap_or("").to_owned());

    match password {
        Some(password) if password == state.configuration.admin_password() => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Admin request with wrong password");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
        }
        None => Err((StatusCode::UNAUTHORIZED, "Missing credentials".to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::HeaderValue;
    use test_case::test_case;

    #[test_case(Some("Token abc123"), Some("abc123"))]
    #[test_case(Some("Token   abc123  "), Some("abc123") ; "surrounding whitespace")]
    #[test_case(Some("Bearer abc123"), None)]
    #[test_case(Some("Token "), None ; "empty token")]
    #[test_case(None, None)]
    fn test_api_token(header: Option<&str>, expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        if let Some(header) = header {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(header).unwrap());
        }
        assert_eq!(api_token(&headers), expected);
    }
}

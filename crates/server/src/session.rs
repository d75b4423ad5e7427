use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

use tripchat_core::domain::user::UserId;
use tripchat_core::session::SESSION_COOKIE;

use crate::app::AppState;
use crate::error::ApiError;

/// The user a request is authenticated as, taken from the `auth_token`
/// cookie or an `Authorization: Bearer` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser(pub UserId);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            session_token(&parts.headers).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        match state.sessions.verify(&token, Utc::now()) {
            Ok(user_id) => Ok(Self(user_id)),
            Err(error) => {
                tracing::debug!(
                    event_name = "http.session.rejected",
                    reason = %error,
                    "session token rejected"
                );
                Err(ApiError::unauthorized("Invalid token"))
            }
        }
    }
}

/// Cookie first, then bearer header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie.filter(|token| !token.is_empty()).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Expires the session cookie on the client.
pub fn clearing_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

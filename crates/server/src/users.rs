use axum::extract::{Path, State};
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::Json;
use serde::{Deserialize, Serialize};

use tripchat_core::domain::user::{User, UserId};

use crate::app::AppState;
use crate::chat::MessageBody;
use crate::error::ApiError;
use crate::session::{clearing_cookie, SessionUser};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

/// Profile lookup; the session must belong to the requested user.
pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    SessionUser(session_user): SessionUser,
) -> Result<Json<User>, ApiError> {
    let user_id = UserId(user_id);
    if session_user != user_id {
        tracing::warn!(
            event_name = "http.session.subject_mismatch",
            session_user = %session_user,
            requested_user = %user_id,
            "session does not match requested user"
        );
        return Err(ApiError::unauthorized("Invalid token"));
    }
    Ok(Json(load_user(&state, &user_id).await?))
}

pub async fn me(
    State(state): State<AppState>,
    SessionUser(session_user): SessionUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = load_user(&state, &session_user).await?;
    Ok(Json(MeResponse { user }))
}

pub async fn logout() -> ([(HeaderName, String); 1], Json<MessageBody>) {
    (
        [(SET_COOKIE, clearing_cookie())],
        Json(MessageBody { message: "Logged out successfully".to_string() }),
    )
}

async fn load_user(state: &AppState, user_id: &UserId) -> Result<User, ApiError> {
    state.store.users.find_by_id(user_id).await?.ok_or_else(|| ApiError::not_found("user", user_id))
}

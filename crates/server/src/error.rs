use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use tripchat_agent::{ReceiptError, TurnError};
use tripchat_core::errors::{ApplicationError, DomainError, InterfaceError};
use tripchat_db::RepositoryError;

/// Body of every failed response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure of one HTTP request, already reduced to what the client may see.
/// `detail` keeps the underlying cause for the server log only.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub correlation_id: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), None)
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApplicationError::NotFound { entity, id: id.to_string() }.into()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApplicationError::Unauthorized(message.into()).into()
    }

    fn new(status: StatusCode, message: String, detail: Option<String>) -> Self {
        Self { status, message, correlation_id: uuid::Uuid::new_v4().to_string(), detail }
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = matches!(error, InterfaceError::Internal { .. }).then(|| error.to_string());
        Self {
            status,
            message: error.user_message(),
            correlation_id: error.correlation_id().to_string(),
            detail,
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        error.into_interface(uuid::Uuid::new_v4().to_string()).into()
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<TurnError> for ApiError {
    fn from(error: TurnError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<ReceiptError> for ApiError {
    fn from(error: ReceiptError) -> Self {
        let status = match error {
            ReceiptError::InvalidImage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match &error {
            ReceiptError::Upstream(source) => Some(source.to_string()),
            _ => None,
        };
        Self::new(status, error.to_string(), detail)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                event_name = "http.request.failed",
                correlation_id = %self.correlation_id,
                status = self.status.as_u16(),
                detail = self.detail.as_deref().unwrap_or(&self.message),
                "request failed"
            );
        } else {
            tracing::debug!(
                event_name = "http.request.rejected",
                correlation_id = %self.correlation_id,
                status = self.status.as_u16(),
                message = %self.message,
                "request rejected"
            );
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

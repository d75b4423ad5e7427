use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    #[error("event ends ({end}) before it starts ({start})")]
    InvertedEventWindow { start: NaiveDateTime, end: NaiveDateTime },
    #[error(
        "event dates {start}..={end} fall outside the trip dates {trip_start}..={trip_end}"
    )]
    OutsideTrip { start: NaiveDate, end: NaiveDate, trip_start: NaiveDate, trip_end: NaiveDate },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField { field: field.to_string(), reason: reason.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("upstream model failure: {0}")]
    Upstream(String),
    #[error("store failure: {0}")]
    Store(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text that is safe to hand back to a browser.
    ///
    /// Client-side failures echo their message since it names the offending
    /// field or credential problem; internal failures never leak their cause.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::NotFound { message, .. } => message.clone(),
            Self::Unauthorized { message, .. } => message.clone(),
            Self::Internal { .. } => "Internal server error".to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Unauthorized { .. } => 401,
            Self::Internal { .. } => 500,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Validation(message) => Self::BadRequest { message, correlation_id },
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Unauthorized(message) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::Upstream(message) | ApplicationError::Store(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn validation_error_maps_to_bad_request_with_field_message() {
        let interface = ApplicationError::Validation(
            "Missing required parameters. userId and message are required.".to_owned(),
        )
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 400);
        assert!(interface.user_message().contains("userId and message"));
    }

    #[test]
    fn domain_error_maps_to_bad_request() {
        let interface =
            ApplicationError::from(DomainError::missing("trip_name")).into_interface("req-2");

        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.user_message(), "missing required field `trip_name`");
    }

    #[test]
    fn not_found_is_distinct_from_store_failure() {
        let missing = ApplicationError::NotFound { entity: "trip", id: "t-1".to_owned() }
            .into_interface("req-3");
        let store = ApplicationError::Store("disk I/O error".to_owned()).into_interface("req-3");

        assert_eq!(missing.status_code(), 404);
        assert_eq!(store.status_code(), 500);
    }

    #[test]
    fn upstream_failure_never_leaks_cause() {
        let interface = ApplicationError::Upstream("provider returned 503 with key abc".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "Internal server error");
        assert_eq!(interface.correlation_id(), "req-4");
    }
}

//! Signed session tokens for routes that need an authenticated user.
//!
//! Token layout: `<user_id>.<expires_at_unix>.<hex hmac-sha256>`; the MAC
//! covers `<user_id>.<expires_at_unix>`.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::user::UserId;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "auth_token";

/// Longest accepted session lifetime, one year.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token is malformed")]
    Malformed,
    #[error("session token signature does not match")]
    BadSignature,
    #[error("session token expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("session signing key is unusable")]
    InvalidKey,
    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
}

#[derive(Clone, Debug)]
pub struct SessionSigner {
    secret: SecretString,
    ttl: Duration,
}

impl SessionSigner {
    /// Lifetimes above [`MAX_SESSION_TTL_HOURS`] are clamped to it.
    pub fn new(secret: SecretString, ttl_hours: u64) -> Self {
        let hours = ttl_hours.min(MAX_SESSION_TTL_HOURS) as i64;
        Self { secret, ttl: Duration::hours(hours) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let expires_at =
            now.checked_add_signed(self.ttl).ok_or(SessionError::ExpiryOutOfRange)?.timestamp();
        let payload = format!("{user_id}.{expires_at}");
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, SessionError> {
        let mut parts = token.trim().rsplitn(3, '.');
        let (Some(signature), Some(expires_at), Some(user_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Malformed);
        };
        if user_id.is_empty() {
            return Err(SessionError::Malformed);
        }

        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;
        let payload = format!("{user_id}.{expires_at}");
        self.mac(&payload)?.verify_slice(&signature).map_err(|_| SessionError::BadSignature)?;

        let expires_at = expires_at
            .parse::<i64>()
            .ok()
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .ok_or(SessionError::Malformed)?;
        if expires_at <= now {
            return Err(SessionError::Expired(expires_at));
        }

        Ok(UserId::from(user_id))
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SessionError::InvalidKey)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{SessionError, SessionSigner, MAX_SESSION_TTL_HOURS};
    use crate::domain::user::UserId;

    fn signer() -> SessionSigner {
        SessionSigner::new("0123456789abcdef0123".to_string().into(), 24)
    }

    #[test]
    fn issued_token_verifies_to_same_user() {
        let now = Utc::now();
        let user = UserId::from("7f0c9a1e-user");
        let token = signer().issue(&user, now).expect("issue");

        assert_eq!(signer().verify(&token, now), Ok(user));
    }

    #[test]
    fn tampered_subject_is_rejected() {
        let now = Utc::now();
        let token = signer().issue(&UserId::from("alice"), now).expect("issue");
        let forged = token.replacen("alice", "mallory", 1);

        assert_eq!(signer().verify(&forged, now), Err(SessionError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = signer().issue(&UserId::from("alice"), now).expect("issue");

        let later = now + Duration::hours(25);
        assert!(matches!(signer().verify(&token, later), Err(SessionError::Expired(_))));
    }

    #[test]
    fn other_secret_and_garbage_are_rejected() {
        let now = Utc::now();
        let token = signer().issue(&UserId::from("alice"), now).expect("issue");
        let other = SessionSigner::new("another-secret-value-000".to_string().into(), 24);

        assert_eq!(other.verify(&token, now), Err(SessionError::BadSignature));
        assert_eq!(signer().verify("not-a-token", now), Err(SessionError::Malformed));
    }

    #[test]
    fn oversized_lifetime_is_clamped_to_one_year() {
        let now = Utc::now();
        let signer = SessionSigner::new("0123456789abcdef0123".to_string().into(), u64::MAX);
        assert_eq!(signer.ttl(), Duration::hours(MAX_SESSION_TTL_HOURS as i64));

        let token = signer.issue(&UserId::from("alice"), now).expect("issue");
        assert_eq!(signer.verify(&token, now + Duration::days(364)), Ok(UserId::from("alice")));
        assert!(matches!(
            signer.verify(&token, now + Duration::days(366)),
            Err(SessionError::Expired(_))
        ));
    }
}

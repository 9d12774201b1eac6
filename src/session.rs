//! Session management.
//!
//! Provides:
//! - `SessionUser`: the logged-in user, stored in an encrypted private cookie
//! - `derive_cookie_key`: cookie key derivation from the configured secret
//! - `session_cookie` / `removal_cookie`: cookie construction

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::Duration as TimeDuration;

use crate::config::COOKIE_KEY_INFO;
use crate::db::User;

/// Cookie names used for authentication
pub mod cookie_names {
    /// Session cookie containing serialized SessionUser
    pub const SESSION: &str = "medibot_session";
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Authenticated user information.
///
/// This is stored in a private cookie and represents the current session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    /// When this session expires (Unix timestamp)
    pub expires_at: u64,
}

impl SessionUser {
    /// Create a new session for a stored user
    pub fn new(user: &User, lifetime: Duration) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            expires_at: now_secs() + lifetime.as_secs(),
        }
    }

    /// Check if this session has expired
    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }

    /// Decode a session from a cookie value; expired or malformed sessions are `None`
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        serde_json::from_str::<SessionUser>(value)
            .ok()
            .filter(|session| !session.is_expired())
    }
}

/// Derive a 64-byte cookie key from an arbitrary-length secret using HKDF
pub fn derive_cookie_key(secret: &str) -> Key {
    let hkdf = Hkdf::<Sha256>::new(None, secret.as_bytes());
    let mut key_bytes = [0u8; 64];
    // Infallible: 64 <= 255 * 32
    let _ = hkdf.expand(COOKIE_KEY_INFO, &mut key_bytes);
    Key::from(&key_bytes)
}

/// Build the session cookie for a logged-in user
pub fn session_cookie(session: &SessionUser, lifetime: Duration) -> Cookie<'static> {
    let value = serde_json::to_string(session).unwrap_or_default();
    Cookie::build((cookie_names::SESSION, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(lifetime.as_secs() as i64))
        .build()
}

/// Cookie that clears the session
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((cookie_names::SESSION, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("carol".into(), "carol@example.com".into(), "hash".into())
    }

    #[test]
    fn test_session_roundtrip_through_cookie_value() {
        let session = SessionUser::new(&user(), Duration::from_secs(3600));
        let cookie = session_cookie(&session, Duration::from_secs(3600));
        assert_eq!(cookie.name(), cookie_names::SESSION);
        assert_eq!(SessionUser::from_cookie_value(cookie.value()), Some(session));
    }

    #[test]
    fn test_expired_session_rejected() {
        let mut session = SessionUser::new(&user(), Duration::from_secs(3600));
        session.expires_at = now_secs().saturating_sub(1);
        let value = serde_json::to_string(&session).unwrap();
        assert!(SessionUser::from_cookie_value(&value).is_none());
    }

    #[test]
    fn test_garbage_cookie_rejected() {
        assert!(SessionUser::from_cookie_value("{not json").is_none());
    }

    #[test]
    fn test_cookie_key_is_deterministic() {
        let a = derive_cookie_key("secret");
        let b = derive_cookie_key("secret");
        let c = derive_cookie_key("other");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}

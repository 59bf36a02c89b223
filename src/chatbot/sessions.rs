//! Bearer tokens issued on login.
//!
//! Tokens are opaque random strings kept in memory; restarting the server
//! logs everyone out.

use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

const TOKEN_BYTES: usize = 32;

/// Body returned by `POST /token`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

struct Session {
    user_id: i64,
    expires: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: TimeDelta,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            ttl: TimeDelta::try_minutes(ttl_minutes).unwrap_or(TimeDelta::MAX),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<AccessToken, String> {
        self.issue_at(user_id, Utc::now())
    }

    /// User id behind a live token.
    pub fn resolve(&self, token: &str) -> Result<Option<i64>, String> {
        self.resolve_at(token, Utc::now())
    }

    /// Drop every token held by `user_id`.
    pub fn revoke_user(&self, user_id: i64) -> Result<(), String> {
        self.sessions()?.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<AccessToken, String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut token = String::with_capacity(TOKEN_BYTES * 2);
        for b in bytes {
            let _ = write!(token, "{:02x}", b);
        }

        let expires = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.sessions()?.insert(token.clone(), Session { user_id, expires });
        debug!("Issued token for user {} until {}", user_id, expires);

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: (expires - now).num_seconds(),
        })
    }

    fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Option<i64>, String> {
        let mut sessions = self.sessions()?;
        sessions.retain(|_, s| s.expires > now);
        Ok(sessions.get(token).map(|s| s.user_id))
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, String> {
        self.sessions.lock().map_err(|_| "session store lock poisoned".to_string())
    }
}

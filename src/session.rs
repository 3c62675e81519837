// ABOUTME: Server-side session store keyed by opaque ids carried in an HttpOnly cookie
// ABOUTME: Issues, resolves, expires and clears login sessions for blog users

use crate::error::{AppError, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "postboard_session";

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    max_age_seconds: i64,
}

impl SessionStore {
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age_seconds,
        }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    pub fn create_session(&self, user_id: Uuid) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session_data = SessionData {
            user_id,
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.clone(), session_data);
        }

        session_id
    }

    /// Expired sessions resolve to `None` even before the sweeper drops them.
    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let cutoff = chrono::Utc::now().timestamp() - self.max_age_seconds;
        let sessions = self.sessions.read().ok()?;
        sessions
            .get(session_id)
            .filter(|session| session.created_at > cutoff)
            .cloned()
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    /// Drops every session belonging to a user, e.g. after the account is deleted.
    pub fn remove_user_sessions(&self, user_id: Uuid) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| session.user_id != user_id);
        }
    }

    pub fn cleanup_expired_sessions(&self) -> usize {
        let cutoff = chrono::Utc::now().timestamp() - self.max_age_seconds;

        match self.sessions.write() {
            Ok(mut sessions) => {
                let before = sessions.len();
                sessions.retain(|_, session| session.created_at > cutoff);
                before - sessions.len()
            }
            Err(_) => 0,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    #[cfg(test)]
    fn backdate(&self, session_id: &str, seconds: i64) {
        if let Ok(mut sessions) = self.sessions.write() {
            if let Some(session) = sessions.get_mut(session_id) {
                session.created_at -= seconds;
            }
        }
    }
}

pub fn create_session_cookie(session_id: String, secure: bool, max_age: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .path("/")
        .build()
}

pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

pub fn session_id_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn extract_session_from_jar(
    jar: &CookieJar,
    session_store: &SessionStore,
) -> Result<SessionData> {
    let session_id = session_id_from_jar(jar)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    session_store
        .get_session(&session_id)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
}

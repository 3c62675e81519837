// ABOUTME: Authentication helper functions for session validation in endpoints
// ABOUTME: Resolves the logged-in user id from the session cookie

use crate::{AppState, error, session};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

pub fn validate_session(jar: &CookieJar, state: &AppState) -> error::Result<session::SessionData> {
    session::extract_session_from_jar(jar, &state.sessions)
}

pub fn require_user_id(jar: &CookieJar, state: &AppState) -> error::Result<Uuid> {
    Ok(validate_session(jar, state)?.user_id)
}

/// Session user if there is a valid session, without failing the request.
pub fn optional_user_id(jar: &CookieJar, state: &AppState) -> Option<Uuid> {
    validate_session(jar, state).ok().map(|session| session.user_id)
}

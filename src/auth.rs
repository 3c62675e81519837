// ABOUTME: Account registration, password login, current-user lookup and logout
// ABOUTME: Successful register/login issue a server-side session behind an HttpOnly cookie

use axum::{extract::State, response::Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::password::{hash_password, verify_password};
use crate::storage::NewUser;
use crate::types::*;
use crate::validation::{non_empty, normalize_email, sanitize_string, validate_user_data};
use crate::{AppState, auth_helpers, session};

fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> CookieJar {
    let session_id = state.sessions.create_session(user_id);
    let cookie = session::create_session_cookie(
        session_id,
        state.config.secure_cookies,
        state.sessions.max_age_seconds(),
    );
    jar.add(cookie)
}

/// A concurrent registration can slip past the lookup and hit the unique
/// index instead; report it the same way as the lookup does.
fn registration_conflict(err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::BadRequest("Email already in use".to_string()),
        other => other,
    }
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<UserSummary>)> {
    let (Some(name), Some(email), Some(password)) = (
        non_empty(req.name),
        non_empty(req.email),
        non_empty(req.password),
    ) else {
        return Err(AppError::BadRequest(
            "Name, email, and password are required".to_string(),
        ));
    };

    let name = sanitize_string(&name);
    let email = normalize_email(&email);
    validate_user_data(Some(&name), Some(&email)).map_err(AppError::BadRequest)?;

    if state.storage.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already in use".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .storage
        .create_user(NewUser {
            name,
            email,
            password_hash: Some(password_hash),
        })
        .await
        .map_err(registration_conflict)?;

    let jar = start_session(&state, jar, user.id);
    Ok((jar, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserSummary>)> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let (Some(email), Some(password)) = (non_empty(req.email), non_empty(req.password)) else {
        return Err(invalid());
    };

    let user = state
        .storage
        .find_user_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(invalid)?;

    // Accounts created through /api/users have no password and cannot log in.
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&password, hash));
    if !verified {
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    let jar = start_session(&state, jar, user.id);
    Ok((jar, Json(user.into())))
}

pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Json<Option<UserProfile>> {
    let Some(user_id) = auth_helpers::optional_user_id(&jar, &state) else {
        return Json(None);
    };

    match state.storage.find_user(user_id).await {
        Ok(user) => Json(user.map(UserProfile::from)),
        Err(err) => {
            tracing::error!("Auth check failed: {}", err);
            Json(None)
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(session_id) = session::session_id_from_jar(&jar) {
        state.sessions.remove_session(&session_id);
    }

    let jar = jar.add(session::create_logout_cookie(state.config.secure_cookies));
    (jar, Json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_index_conflict_reads_like_the_lookup() {
        let err = registration_conflict(AppError::Conflict("Email already exists".to_string()));
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == "Email already in use"));

        let err = registration_conflict(AppError::NotFound("x".to_string()));
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

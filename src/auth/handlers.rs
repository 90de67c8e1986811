use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Form, Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterRequest, TokenResponse},
        jwt::JwtKeys,
        password,
    },
    error::{self, ApiError},
    state::AppState,
    users::repo::User,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", post(login))
        .route("/users", post(register))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Login. Unknown identity and wrong password produce the exact same error
/// value, so the two responses are indistinguishable on the wire.
#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = User::find_by_identifier(&state.db, form.username.trim())
        .await?
        .ok_or_else(|| {
            warn!("login with unknown identity");
            ApiError::InvalidCredentials
        })?;

    if !password::verify_password(&form.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(&user.email)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token)))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.username.is_empty() {
        return Err(ApiError::Validation("Username must not be empty".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateRegistration("Email already registered"));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::DuplicateRegistration("Username already taken"));
    }

    let hash = password::hash_password(&payload.password)?;

    // The pre-checks race with concurrent registrations; the unique
    // constraints are the source of truth.
    let user = User::create(&state.db, &payload.email, &payload.username, &hash)
        .await
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                ApiError::DuplicateRegistration("Email already registered")
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, handlers::is_valid_email, password},
    documents::dto::Pagination,
    error::{self, ApiError},
    state::AppState,
    users::{
        dto::UserUpdate,
        repo::{User, UserChanges},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me).put(update_me).delete(delete_me))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = User::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

#[instrument(skip(state, update))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let user = apply_update(&state, id, update).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User"));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let user = apply_update(&state, user.id, update).await?;
    Ok(Json(user))
}

#[instrument(skip_all)]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    if !User::delete(&state.db, user.id).await? {
        return Err(ApiError::NotFound("User"));
    }
    info!(user_id = %user.id, "user deleted own account");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// Validate a partial update, hash a new password if one was sent and apply
/// the remaining fields as-is.
async fn apply_update(state: &AppState, id: Uuid, mut update: UserUpdate) -> Result<User, ApiError> {
    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
    }
    if let Some(username) = update.username.as_deref() {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("Username must not be empty".into()));
        }
    }

    let password_hash = match update.password.as_deref() {
        Some(p) if p.len() < 8 => return Err(ApiError::Validation("Password too short".into())),
        Some(p) => Some(password::hash_password(p)?),
        None => None,
    };

    let changes = UserChanges {
        email: update.email,
        username: update.username,
        password_hash,
    };

    User::update(&state.db, id, &changes)
        .await
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                ApiError::DuplicateRegistration("Email or username already taken")
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("User"))
}

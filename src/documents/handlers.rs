use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    documents::{
        dto::{DocumentCreate, DocumentUpdate, Pagination},
        repo::{Document, DocumentChanges},
    },
    error::{self, ApiError},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
}

#[instrument(skip_all)]
pub async fn create_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<DocumentCreate>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    if payload.key.trim().is_empty() {
        return Err(ApiError::Validation("Key must not be empty".into()));
    }

    let document = Document::create(&state.db, &payload.key, &payload.content)
        .await
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                ApiError::Validation("Document key already exists".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(document_id = %document.id, key = %document.key, user_id = %user.id, "document created");
    Ok((StatusCode::CREATED, Json(document)))
}

#[instrument(skip(state, _user))]
pub async fn list_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = Document::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(documents))
}

#[instrument(skip(state, _user))]
pub async fn get_document(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    let document = Document::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Document"))?;
    Ok(Json(document))
}

#[instrument(skip(state, _user, update))]
pub async fn update_document(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<DocumentUpdate>,
) -> Result<Json<Document>, ApiError> {
    if let Some(key) = update.key.as_deref() {
        if key.trim().is_empty() {
            return Err(ApiError::Validation("Key must not be empty".into()));
        }
    }

    let changes = DocumentChanges {
        key: update.key,
        content: update.content,
    };

    let document = Document::update(&state.db, id, &changes)
        .await
        .map_err(|e| {
            if error::is_unique_violation(&e) {
                ApiError::Validation("Document key already exists".into())
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("Document"))?;

    Ok(Json(document))
}

#[instrument(skip(state, _user))]
pub async fn delete_document(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !Document::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Document"));
    }
    info!(document_id = %id, "document deleted");
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

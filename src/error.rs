use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Why a presented token was rejected. Internal only: every variant collapses
/// to the same opaque 401 at the boundary so a client cannot probe which
/// check failed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    MalformedToken,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    ExpiredToken,
    #[error("unknown subject")]
    UnknownSubject,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error("{0}")]
    DuplicateRegistration(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Unauthorized(kind) => {
                warn!(%kind, "request rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "Could not validate credentials".to_string(),
                )
            }
            ApiError::DuplicateRegistration(_) | ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

/// True when the underlying database error is a unique-constraint violation.
/// Lets handlers turn a lost insert race into the same 400 the pre-check
/// would have produced.
pub fn is_unique_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

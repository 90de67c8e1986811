use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::jwt::JwtKeys,
    error::{ApiError, AuthError},
    state::AppState,
    users::repo::User,
};

/// Extracts the bearer token, verifies it and resolves the subject against
/// the credential store. Rejects the request before the handler body runs,
/// so no protected operation touches persistence on a bad token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MalformedToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AuthError::MalformedToken)?;

        let claims = JwtKeys::from_ref(state).verify(token)?;

        let user = User::find_by_email(&state.db, &claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(CurrentUser(user))
    }
}

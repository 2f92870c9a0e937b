//! Request extractors.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::AppState;
use crate::auth::bearer_token;
use crate::error::Error;
use crate::model::User;

/// The user behind a request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated user.
    pub user: User,
    /// The presented token, needed to end the session.
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| Error::unauthorized("missing bearer token"))?
            .to_string();

        let user = state.storage.lock().await.authenticate_token(&token)?;
        Ok(Self { user, token })
    }
}

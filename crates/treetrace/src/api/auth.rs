//! Registration, login and logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::{client_input, AppState, AuthUser};
use crate::auth::validate_registration;
use crate::error::Result;
use crate::model::{Credentials, NewUser, User};

/// A freshly issued session.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    token: String,
    user: User,
}

pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(new_user) = client_input(payload)?;
    validate_registration(&new_user, state.config.auth.min_password_length)?;

    let storage = state.storage.lock().await;
    let user = storage.register_user(new_user)?;
    let token = storage.create_session(&user.id, state.config.session_ttl())?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(credentials) = client_input(payload)?;

    let storage = state.storage.lock().await;
    let user = storage.verify_credentials(&credentials)?;
    let token = storage.create_session(&user.id, state.config.session_ttl())?;

    info!("User {} logged in", user.id);
    Ok(Json(AuthResponse { token, user }))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode> {
    state.storage.lock().await.delete_session(&auth.token)?;
    info!("User {} logged out", auth.user.id);
    Ok(StatusCode::NO_CONTENT)
}

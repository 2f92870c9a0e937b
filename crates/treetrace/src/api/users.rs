//! User lookup.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{client_input, AppState, AuthUser};
use crate::error::{Error, Result};
use crate::model::{FamilyMember, User};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<User>>> {
    let Query(params) = client_input(params)?;
    if params.q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }

    let max = state.config.search.max_results;
    let limit = params.limit.unwrap_or(max).clamp(1, max);
    let users = state
        .storage
        .lock()
        .await
        .search_users(&params.q, &auth.user.id, limit)?;
    Ok(Json(users))
}

/// Members of a user's tree: all of them for the owner, public ones otherwise.
pub async fn family_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<FamilyMember>>> {
    let storage = state.storage.lock().await;
    if user_id == auth.user.id {
        return Ok(Json(storage.list_members(&user_id)?));
    }
    if storage.get_user(&user_id)?.is_none() {
        return Err(Error::not_found("user", user_id));
    }
    Ok(Json(storage.list_public_members(&user_id)?))
}

//! Health condition handlers. All of them are restricted to the member's owner.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::{client_input, AppState, AuthUser};
use crate::error::Result;
use crate::model::{HealthCondition, HealthConditionPatch, NewHealthCondition};

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(member_id): Path<String>,
) -> Result<Json<Vec<HealthCondition>>> {
    let conditions = state
        .storage
        .lock()
        .await
        .list_conditions(&member_id, &auth.user.id)?;
    Ok(Json(conditions))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(member_id): Path<String>,
    payload: std::result::Result<Json<NewHealthCondition>, JsonRejection>,
) -> Result<(StatusCode, Json<HealthCondition>)> {
    let Json(new_condition) = client_input(payload)?;
    let condition = state
        .storage
        .lock()
        .await
        .create_condition(&member_id, &auth.user.id, new_condition)?;
    Ok((StatusCode::CREATED, Json(condition)))
}

pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<HealthCondition>> {
    let condition = state
        .storage
        .lock()
        .await
        .get_condition(&id, &auth.user.id)?;
    Ok(Json(condition))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: std::result::Result<Json<HealthConditionPatch>, JsonRejection>,
) -> Result<Json<HealthCondition>> {
    let Json(patch) = client_input(payload)?;
    let condition = state
        .storage
        .lock()
        .await
        .update_condition(&id, &auth.user.id, patch)?;
    Ok(Json(condition))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .storage
        .lock()
        .await
        .delete_condition(&id, &auth.user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

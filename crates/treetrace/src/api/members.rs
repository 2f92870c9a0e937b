//! Family member handlers, tree views, health history and suggestions.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{client_input, AppState, AuthUser};
use crate::error::{Error, Result};
use crate::heredity::{build_history, HealthHistory};
use crate::model::{FamilyMember, FamilyMemberPatch, NewFamilyMember};
use crate::storage::Storage;
use crate::suggest::{suggest, Suggestion};
use crate::tree::{AncestorNode, ChartNode, DescendantNode, FamilyIndex, Relative};

#[derive(Debug, Deserialize)]
pub struct DepthParams {
    depth: Option<usize>,
}

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type DepthQuery = std::result::Result<Query<DepthParams>, QueryRejection>;

/// The part of `member`'s tree the viewer may see.
///
/// Owners see their whole tree; anyone else sees only its public members.
fn visible_index(storage: &Storage, member: &FamilyMember, viewer_id: &str) -> Result<FamilyIndex> {
    if member.user_id == viewer_id {
        storage.family_index(viewer_id)
    } else {
        Ok(FamilyIndex::new(storage.list_public_members(&member.user_id)?))
    }
}

pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<FamilyMember>>> {
    Ok(Json(state.storage.lock().await.list_members(&auth.user.id)?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: JsonBody<NewFamilyMember>,
) -> Result<(StatusCode, Json<FamilyMember>)> {
    let Json(new_member) = client_input(payload)?;
    let member = state
        .storage
        .lock()
        .await
        .create_member(&auth.user.id, new_member)?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn chart(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<ChartNode>>> {
    let index = state.storage.lock().await.family_index(&auth.user.id)?;
    Ok(Json(index.chart()))
}

pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FamilyMember>> {
    let member = state
        .storage
        .lock()
        .await
        .get_visible_member(&id, &auth.user.id)?;
    Ok(Json(member))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: JsonBody<FamilyMemberPatch>,
) -> Result<Json<FamilyMember>> {
    let Json(patch) = client_input(payload)?;
    let member = state
        .storage
        .lock()
        .await
        .update_member(&id, &auth.user.id, patch)?;
    Ok(Json(member))
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
        .delete_member(&id, &auth.user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ancestors(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    params: DepthQuery,
) -> Result<Json<AncestorNode>> {
    let Query(params) = client_input(params)?;
    let depth = state.config.resolve_depth(params.depth);

    let storage = state.storage.lock().await;
    let member = storage.get_visible_member(&id, &auth.user.id)?;
    visible_index(&storage, &member, &auth.user.id)?
        .ancestors(&id, depth)
        .map(Json)
        .ok_or_else(|| Error::not_found("family member", id))
}

pub async fn descendants(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    params: DepthQuery,
) -> Result<Json<DescendantNode>> {
    let Query(params) = client_input(params)?;
    let depth = state.config.resolve_depth(params.depth);

    let storage = state.storage.lock().await;
    let member = storage.get_visible_member(&id, &auth.user.id)?;
    visible_index(&storage, &member, &auth.user.id)?
        .descendants(&id, depth)
        .map(Json)
        .ok_or_else(|| Error::not_found("family member", id))
}

pub async fn relatives(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Relative>>> {
    let storage = state.storage.lock().await;
    let member = storage.get_visible_member(&id, &auth.user.id)?;
    let index = visible_index(&storage, &member, &auth.user.id)?;
    Ok(Json(index.relatives(&id)))
}

/// Conditions of the member's blood relatives. Owner only.
pub async fn health_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<HealthHistory>> {
    let storage = state.storage.lock().await;
    storage.get_owned_member(&id, &auth.user.id)?;

    let relatives = storage.family_index(&auth.user.id)?.relatives(&id);
    let conditions = storage.conditions_by_member(&auth.user.id)?;
    Ok(Json(build_history(&id, relatives, &conditions)))
}

/// Public members of other trees that may be the same person. Owner only.
pub async fn suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Suggestion>>> {
    let storage = state.storage.lock().await;
    let member = storage.get_owned_member(&id, &auth.user.id)?;
    let candidates = storage.public_candidates(&auth.user.id)?;
    Ok(Json(suggest(&member, candidates, &state.config.suggestions)))
}

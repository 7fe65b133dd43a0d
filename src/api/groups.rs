//! Group endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::routes::{ApiResponse, Payload};
use super::server::AppState;
use crate::auth::{AdminSession, AuthSession, Status};
use crate::error::{Error, Result};
use crate::models::{GroupChanges, GroupDetail, GroupUpdate, NewGroup};

fn group_not_found() -> Error {
    Error::NotFound("Grupo não encontrado".to_string())
}

pub async fn list_groups(
    _session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let groups = state.store.list_groups().await?;
    Ok(Json(ApiResponse::ok(groups)))
}

pub async fn create_group(
    _admin: AdminSession,
    State(state): State<AppState>,
    Payload(payload): Payload<NewGroup>,
) -> Result<impl IntoResponse> {
    let group = state.store.insert_group(payload.validate()?).await?;
    tracing::info!(group = group.id, code = %group.code, "Group created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(group, "Grupo criado com sucesso")),
    ))
}

pub async fn get_group(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let group = state.store.get_group(id).await?.ok_or_else(group_not_found)?;
    let members = state.store.group_members(id).await?;

    Ok(Json(ApiResponse::ok(GroupDetail { group, members })))
}

pub async fn update_group(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Payload(update): Payload<GroupUpdate>,
) -> Result<impl IntoResponse> {
    // The store refuses deactivation while active members remain
    let changes = update.into_changes()?;
    let group = state
        .store
        .update_group(id, changes)
        .await?
        .ok_or_else(group_not_found)?;

    tracing::info!(group = id, "Group updated");
    Ok(Json(ApiResponse::with_message(group, "Grupo atualizado com sucesso")))
}

pub async fn deactivate_group(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .store
        .update_group(id, GroupChanges::status(Status::Inactive))
        .await?
        .ok_or_else(group_not_found)?;

    tracing::info!(group = id, "Group deactivated");
    Ok(Json(ApiResponse::<()>::message("Grupo desativado com sucesso")))
}

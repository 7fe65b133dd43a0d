//! Contract endpoints

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
use crate::models::{ContractChanges, ContractDetail, ContractUpdate, NewContract};
use crate::store::Store;

fn contract_not_found() -> Error {
    Error::NotFound("Contrato não encontrado".to_string())
}

async fn check_group(store: &dyn Store, group_id: Option<i64>) -> Result<()> {
    if let Some(id) = group_id {
        if store.get_group(id).await?.is_none() {
            return Err(Error::BadRequest("Grupo não encontrado".to_string()));
        }
    }
    Ok(())
}

pub async fn list_contracts(
    _session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let contracts = state.store.list_contracts().await?;
    Ok(Json(ApiResponse::ok(contracts)))
}

pub async fn create_contract(
    _admin: AdminSession,
    State(state): State<AppState>,
    Payload(payload): Payload<NewContract>,
) -> Result<impl IntoResponse> {
    check_group(state.store.as_ref(), payload.grupo_id).await?;
    let contract = state.store.insert_contract(payload).await?;
    tracing::info!(contract = contract.id, code = %contract.code, "Contract created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            contract,
            "Contrato criado com sucesso",
        )),
    ))
}

pub async fn get_contract(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let contract = state
        .store
        .get_contract(id)
        .await?
        .ok_or_else(contract_not_found)?;
    let group = match contract.group_id {
        Some(group_id) => state.store.get_group(group_id).await?,
        None => None,
    };

    Ok(Json(ApiResponse::ok(ContractDetail { contract, group })))
}

pub async fn update_contract(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Payload(update): Payload<ContractUpdate>,
) -> Result<impl IntoResponse> {
    let changes = update.into_changes()?;
    check_group(state.store.as_ref(), changes.group_id.flatten()).await?;

    let contract = state
        .store
        .update_contract(id, changes)
        .await?
        .ok_or_else(contract_not_found)?;

    tracing::info!(contract = id, "Contract updated");
    Ok(Json(ApiResponse::with_message(
        contract,
        "Contrato atualizado com sucesso",
    )))
}

pub async fn deactivate_contract(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .store
        .update_contract(id, ContractChanges::status(Status::Inactive))
        .await?
        .ok_or_else(contract_not_found)?;

    tracing::info!(contract = id, "Contract deactivated");
    Ok(Json(ApiResponse::<()>::message(
        "Contrato desativado com sucesso",
    )))
}

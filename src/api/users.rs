//! User endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::routes::{ApiResponse, Payload};
use super::server::AppState;
use crate::auth::password::{default_password, hash_blocking};
use crate::auth::{AdminSession, AuthSession, Status};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::models::{NewUser, PublicUser, User, UserChanges, UserDetail, UserFilter, UserUpdate};
use crate::store::Store;

fn user_not_found() -> Error {
    Error::NotFound("Usuário não encontrado".to_string())
}

/// Validate a new user, give it the initial password and store it
pub async fn provision_user(
    store: &dyn Store,
    auth: &AuthConfig,
    payload: NewUser,
) -> Result<User> {
    let mut user = payload.into_user(String::new())?;
    let initial = default_password(&auth.default_password_prefix, user.matricula);
    user.password_hash = hash_blocking(initial, auth.bcrypt_cost).await?;

    let user = store.insert_user(user).await?;
    tracing::info!(matricula = user.matricula, role = %user.role, "User created");
    Ok(user)
}

/// Reject references to groups or contracts that do not exist
async fn check_references(
    store: &dyn Store,
    group_id: Option<i64>,
    contract_id: Option<i64>,
) -> Result<()> {
    if let Some(id) = group_id {
        if store.get_group(id).await?.is_none() {
            return Err(Error::BadRequest("Grupo não encontrado".to_string()));
        }
    }
    if let Some(id) = contract_id {
        if store.get_contract(id).await?.is_none() {
            return Err(Error::BadRequest("Contrato não encontrado".to_string()));
        }
    }
    Ok(())
}

async fn detail(store: &dyn Store, user: &User) -> Result<UserDetail> {
    let group = match user.group_id {
        Some(id) => store.get_group(id).await?,
        None => None,
    };
    let contract = match user.contract_id {
        Some(id) => store.get_contract(id).await?,
        None => None,
    };
    Ok(UserDetail {
        user: PublicUser::from(user),
        group,
        contract,
    })
}

pub async fn list_users(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse> {
    let users = state.store.list_users(&filter).await?;
    let groups: HashMap<_, _> = state
        .store
        .list_groups()
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();
    let contracts: HashMap<_, _> = state
        .store
        .list_contracts()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let details: Vec<UserDetail> = users
        .iter()
        .map(|u| UserDetail {
            user: PublicUser::from(u),
            group: u.group_id.and_then(|id| groups.get(&id).cloned()),
            contract: u.contract_id.and_then(|id| contracts.get(&id).cloned()),
        })
        .collect();

    Ok(Json(ApiResponse::ok(details)))
}

pub async fn create_user(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Payload(payload): Payload<NewUser>,
) -> Result<impl IntoResponse> {
    check_references(state.store.as_ref(), payload.grupo_id, payload.contrato_id).await?;
    let user = provision_user(state.store.as_ref(), &state.config.auth, payload).await?;
    tracing::debug!(
        by = admin.user.matricula,
        matricula = user.matricula,
        "Admin created user"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            PublicUser::from(&user),
            "Usuário criado com sucesso",
        )),
    ))
}

pub async fn get_user(
    session: AuthSession,
    State(state): State<AppState>,
    Path(matricula): Path<i64>,
) -> Result<impl IntoResponse> {
    if !session.can_access(matricula) {
        return Err(Error::Forbidden("Acesso negado".to_string()));
    }
    let user = state
        .store
        .get_user(matricula)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(ApiResponse::ok(detail(state.store.as_ref(), &user).await?)))
}

pub async fn update_user(
    session: AuthSession,
    State(state): State<AppState>,
    Path(matricula): Path<i64>,
    Payload(update): Payload<UserUpdate>,
) -> Result<impl IntoResponse> {
    if !session.can_access(matricula) {
        return Err(Error::Forbidden("Acesso negado".to_string()));
    }
    update.authorize(session.is_admin())?;

    check_references(
        state.store.as_ref(),
        update.grupo_id.flatten(),
        update.contrato_id.flatten(),
    )
    .await?;

    let password_hash = match update.new_password()? {
        Some(password) => Some(hash_blocking(password, state.config.auth.bcrypt_cost).await?),
        None => None,
    };
    let changes = update.into_changes(password_hash)?;
    let changed_password = changes.password_hash.is_some();

    let user = state
        .store
        .update_user(matricula, changes)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        matricula,
        by = session.user.matricula,
        changed_password,
        "User updated"
    );

    Ok(Json(ApiResponse::with_message(
        PublicUser::from(&user),
        "Usuário atualizado com sucesso",
    )))
}

/// Soft delete: the record stays, marked inactive
pub async fn deactivate_user(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Path(matricula): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .store
        .update_user(matricula, UserChanges::status(Status::Inactive))
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(matricula, by = admin.user.matricula, "User deactivated");
    Ok(Json(ApiResponse::<()>::message("Usuário desativado com sucesso")))
}

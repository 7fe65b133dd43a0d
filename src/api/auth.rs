//! Login, logout and identity endpoints

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::routes::{ApiResponse, Payload};
use super::server::AppState;
use crate::auth::password::{check_blocking, default_password};
use crate::auth::session::{clear_cookie, session_cookie};
use crate::auth::{AuthSession, LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::models::{normalize_phone, PublicUser, User};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: PublicUser,
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Credenciais inválidas".to_string())
}

/// Whether this login presents an initial password that may be used only once
fn is_single_use_login(state: &AppState, user: &User, password: &str) -> bool {
    let auth = &state.config.auth;
    auth.single_use_default_password
        && !user.pass_sub
        && password == default_password(&auth.default_password_prefix, user.matricula)
}

pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<Response> {
    let phone = req
        .telefone
        .as_deref()
        .map(normalize_phone)
        .filter(|p| !p.is_empty());
    let password = req.password.filter(|p| !p.is_empty());
    let (Some(phone), Some(password)) = (phone, password) else {
        return Err(Error::BadRequest(
            "Telefone e senha são obrigatórios".to_string(),
        ));
    };

    let Some(user) = state.store.find_user_by_phone(&phone).await? else {
        tracing::info!("Login refused: unknown phone");
        return Err(invalid_credentials());
    };

    if !check_blocking(password.clone(), user.password_hash.clone()).await? {
        tracing::info!(matricula = user.matricula, "Login refused: wrong password");
        return Err(invalid_credentials());
    }

    if !user.is_active() {
        tracing::info!(matricula = user.matricula, "Login refused: inactive user");
        return Err(invalid_credentials());
    }

    if is_single_use_login(&state, &user, &password) {
        // At most one concurrent login flips the flag
        if !state.store.consume_default_password(user.matricula).await? {
            tracing::info!(matricula = user.matricula, "Login refused: initial password spent");
            return Err(Error::Unauthorized(
                "Senha padrão já utilizada. Solicite a redefinição ao administrador.".to_string(),
            ));
        }
        tracing::info!(matricula = user.matricula, "Initial password consumed");
    }

    let token = state.tokens.issue(&user)?;
    let auth = &state.config.auth;
    let cookie = session_cookie(
        &auth.cookie_name,
        &token,
        auth.cookie_max_age_days,
        !state.config.server.environment.is_development(),
    );

    tracing::info!(matricula = user.matricula, role = %user.role, "User logged in");

    let body = LoginResponse {
        success: true,
        token,
        user: PublicUser::from(&user),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = clear_cookie(
        &state.config.auth.cookie_name,
        !state.config.server.environment.is_development(),
    );
    (
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::<()>::message("Logout realizado com sucesso")),
    )
}

pub async fn me(session: AuthSession) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: PublicUser::from(&session.user),
    })
}

//! Employee roster lookup used when onboarding users

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::routes::ApiResponse;
use super::server::AppState;
use crate::auth::StaffSession;
use crate::error::{Error, ErrorBody, Result};
use crate::models::{RosterQuery, ROSTER_SEARCH_LIMIT};

pub async fn search_roster(
    _staff: StaffSession,
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
) -> Result<impl IntoResponse> {
    let search = query.search.unwrap_or_default();
    let rows = state
        .store
        .search_roster(&search, ROSTER_SEARCH_LIMIT)
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn get_roster_entry(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(chapa): Path<String>,
) -> Result<impl IntoResponse> {
    let entry = state
        .store
        .get_roster_entry(&chapa)
        .await?
        .ok_or_else(|| Error::NotFound("Colaborador não encontrado".to_string()))?;
    Ok(Json(ApiResponse::ok(entry)))
}

/// The roster is read-only
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            success: false,
            message: "Operação não permitida nesta rota".to_string(),
            details: None,
        }),
    )
}

//! Shared response types, request extractors and small handlers

use axum::{
    extract::{FromRequest, Request, State},
    response::IntoResponse,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use super::server::AppState;
use crate::auth::AuthSession;
use crate::error::{Error, Result};

/// Success envelope returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// JSON body extractor whose rejections use the crate's error envelope
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(Error::BadRequest(format!(
                "Dados inválidos: {}",
                rejection.body_text()
            ))),
        }
    }
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok("healthy"))
}

// Dashboard

pub async fn dashboard_stats(
    _session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let stats = state.store.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

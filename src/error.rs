//! Error types for Academia

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

const INTERNAL_MESSAGE: &str = "Erro interno do servidor";

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Data store unavailable: {0}")]
    Unavailable(String),

    #[error("Data store timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'academia init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl Error {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::BusinessRule(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure payload returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut internal = None;

        let (message, details) = match &self {
            Error::Unavailable(_) => {
                tracing::error!(error = %self, "Data store unreachable");
                (
                    "Erro de conectividade com o banco de dados".to_string(),
                    Some("Verifique sua conexão e tente novamente".to_string()),
                )
            }
            Error::Timeout(_) => {
                tracing::error!(error = %self, "Data store timeout");
                (
                    "Timeout na conexão. Tente novamente.".to_string(),
                    Some("O servidor demorou muito para responder".to_string()),
                )
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Internal server error");
                internal = Some(InternalDetails(self.to_string()));
                (INTERNAL_MESSAGE.to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorBody {
            success: false,
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(internal) = internal {
            response.extensions_mut().insert(internal);
        }
        response
    }
}

/// Text of an internal error, carried on the response extensions
#[derive(Debug, Clone)]
pub struct InternalDetails(pub String);

/// Response mapper installed on the router.
///
/// With `expose` set (development) internal error text is copied into the
/// body's `details`; otherwise it is dropped.
pub async fn attach_internal_details(
    State(expose): State<bool>,
    mut response: Response,
) -> Response {
    let Some(InternalDetails(details)) = response.extensions_mut().remove::<InternalDetails>()
    else {
        return response;
    };
    if !expose {
        return response;
    }

    let body = ErrorBody {
        success: false,
        message: INTERNAL_MESSAGE.to_string(),
        details: Some(details),
    };
    (response.status(), Json(body)).into_response()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn error_response(err: Error) -> (StatusCode, serde_json::Value) {
        read_body(err.into_response()).await
    }

    async fn read_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (status, body) = error_response(Error::Forbidden("Acesso negado".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Acesso negado");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_business_rule_is_bad_request() {
        let (status, _) = error_response(Error::BusinessRule("grupo com membros".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_internal_hides_details_by_default() {
        let (status, body) =
            error_response(Error::Other("connection refused at 10.0.0.5".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Erro interno do servidor");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_development_attaches_internal_details() {
        let response = Error::Other("connection refused at 10.0.0.5".into()).into_response();
        let response = attach_internal_details(State(true), response).await;
        let (status, body) = read_body(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Erro interno do servidor");
        assert_eq!(body["details"], "connection refused at 10.0.0.5");
    }

    #[tokio::test]
    async fn test_production_drops_internal_details() {
        let response = Error::Other("connection refused at 10.0.0.5".into()).into_response();
        let response = attach_internal_details(State(false), response).await;
        assert!(response.extensions().get::<InternalDetails>().is_none());
        let (status, body) = read_body(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_client_errors_pass_through_mapper() {
        let response = Error::NotFound("Grupo não encontrado".into()).into_response();
        let response = attach_internal_details(State(true), response).await;
        let (status, body) = read_body(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Grupo não encontrado");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_store_failures_map_to_gateway_codes() {
        let (status, _) = error_response(Error::Unavailable("refused".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = error_response(Error::Timeout(10)).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}

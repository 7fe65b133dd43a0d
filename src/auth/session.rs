//! Per-request session extractors
//!
//! Handlers receive the caller's identity as an extractor argument. The token
//! only names the caller; role and status always come from the live record.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::api::AppState;
use crate::auth::jwt::Claims;
use crate::auth::models::Role;
use crate::error::{Error, Result};
use crate::models::User;

/// Session token from `Authorization: Bearer`, falling back to the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a freshly issued token
pub fn session_cookie(name: &str, token: &str, max_age_days: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name,
        token,
        max_age_days * 24 * 60 * 60,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        name,
        if secure { "; Secure" } else { "" }
    )
}

/// An authenticated, active caller
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Live record, reloaded on every request
    pub user: User,
    pub claims: Claims,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.user.role, Role::Admin | Role::Manager)
    }

    /// Admins may access any user; everyone else only themselves
    pub fn can_access(&self, matricula: i64) -> bool {
        self.is_admin() || self.user.matricula == matricula
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = extract_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or_else(|| Error::Unauthorized("Token não fornecido".to_string()))?;

        let claims = state.tokens.verify(&token).map_err(|reason| {
            tracing::debug!(%reason, "Rejected session token");
            Error::from(reason)
        })?;

        let user = state
            .store
            .get_user(claims.matricula)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| Error::Unauthorized("Usuário não encontrado ou inativo".to_string()))?;

        Ok(Self { user, claims })
    }
}

/// An authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminSession(pub AuthSession);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            return Err(Error::Forbidden(
                "Acesso negado - privilégios de administrador necessários".to_string(),
            ));
        }
        Ok(Self(session))
    }
}

/// An authenticated administrator or manager
#[derive(Debug, Clone)]
pub struct StaffSession(pub AuthSession);

impl FromRequestParts<AppState> for StaffSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if !session.is_staff() {
            return Err(Error::Forbidden(
                "Acesso negado - privilégios de gestor necessários".to_string(),
            ));
        }
        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let headers = headers(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "auth-token=cookie-token"),
        ]);
        assert_eq!(
            extract_token(&headers, "auth-token").as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn test_cookie_fallback() {
        let headers = headers(&[("cookie", "theme=dark; auth-token=abc.def.ghi; lang=pt")]);
        assert_eq!(
            extract_token(&headers, "auth-token").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token(&headers, "other"), None);
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert_eq!(extract_token(&HeaderMap::new(), "auth-token"), None);
        let headers = headers(&[("authorization", "Basic dXNlcjpwYXNz"), ("cookie", "auth-token=")]);
        assert_eq!(extract_token(&headers, "auth-token"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("auth-token", "t0k3n", 7, false);
        assert_eq!(
            cookie,
            "auth-token=t0k3n; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
        assert!(session_cookie("auth-token", "t", 7, true).ends_with("; Secure"));
        assert!(clear_cookie("auth-token", false).contains("Max-Age=0"));
    }
}

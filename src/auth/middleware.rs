//! Route guard for page navigation
//!
//! Classifies each request path and decides whether it proceeds, proceeds
//! with the caller's identity attached, is redirected, or is refused. API
//! endpoints pass straight through and enforce access themselves.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::api::AppState;
use crate::auth::jwt::{Claims, TokenIssuer};
use crate::auth::models::Status;
use crate::auth::session::extract_token;
use crate::config::GuardMode;

/// Requests under these prefixes are refused outright
pub const BLOCKED_PREFIXES: &[&str] = &["/@vite/"];

/// API and asset prefixes the guard never inspects
pub const PASSTHROUGH_PREFIXES: &[&str] = &["/api", "/static"];

pub const PUBLIC_PATHS: &[&str] = &["/login"];

pub const PROTECTED_PREFIXES: &[&str] = &[
    "/user/dashboard",
    "/user/desafios",
    "/user/riscos-criticos",
    "/user/abrangencia-acidentes",
    "/admin/usuarios",
    "/admin/grupos",
    "/admin/contratos",
];

pub const ADMIN_PREFIXES: &[&str] = &["/admin/usuarios", "/admin/grupos", "/admin/contratos"];

pub const LOGIN_PAGE: &str = "/login";

/// Landing page for the root path and for non-admins on admin pages
pub const LANDING_PAGE: &str = "/user/dashboard";

pub const HEADER_MATRICULA: &str = "x-user-matricula";
pub const HEADER_NOME: &str = "x-user-nome";
pub const HEADER_EMAIL: &str = "x-user-email";
pub const HEADER_ROLE: &str = "x-user-role";

const IDENTITY_HEADER_PREFIX: &str = "x-user-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Blocked,
    Passthrough,
    Public,
    Root,
    Protected { admin_only: bool },
    Unlisted,
}

pub fn classify(path: &str) -> PathClass {
    let under = |prefixes: &[&str]| prefixes.iter().any(|p| path.starts_with(p));

    if under(BLOCKED_PREFIXES) {
        PathClass::Blocked
    } else if under(PASSTHROUGH_PREFIXES) || path.contains('.') {
        PathClass::Passthrough
    } else if PUBLIC_PATHS.contains(&path) {
        PathClass::Public
    } else if under(PROTECTED_PREFIXES) {
        PathClass::Protected {
            admin_only: under(ADMIN_PREFIXES),
        }
    } else if path == "/" {
        PathClass::Root
    } else {
        PathClass::Unlisted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Proceed,
    ProceedWithIdentity(Claims),
    Redirect(&'static str),
    NotFound,
}

impl GuardDecision {
    fn label(&self) -> &'static str {
        match self {
            GuardDecision::Proceed => "proceed",
            GuardDecision::ProceedWithIdentity(_) => "proceed_with_identity",
            GuardDecision::Redirect(_) => "redirect",
            GuardDecision::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    tokens: Arc<TokenIssuer>,
    mode: GuardMode,
}

impl RouteGuard {
    pub fn new(tokens: Arc<TokenIssuer>, mode: GuardMode) -> Self {
        Self { tokens, mode }
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Decide what happens to a request for `path` carrying `token`
    pub fn decide(&self, path: &str, token: Option<&str>) -> GuardDecision {
        match classify(path) {
            PathClass::Blocked => GuardDecision::NotFound,
            PathClass::Passthrough | PathClass::Public | PathClass::Unlisted => {
                GuardDecision::Proceed
            }
            PathClass::Root => GuardDecision::Redirect(LANDING_PAGE),
            PathClass::Protected { admin_only } => {
                let claims = token
                    .and_then(|t| self.tokens.verify(t).ok())
                    .filter(|c| c.status == Status::Active);

                match claims {
                    Some(claims) if admin_only && !claims.is_admin() => {
                        GuardDecision::Redirect(LANDING_PAGE)
                    }
                    Some(claims) => GuardDecision::ProceedWithIdentity(claims),
                    // Advisory: the page rechecks on the client and the API enforces
                    None => match self.mode {
                        GuardMode::Advisory => GuardDecision::Proceed,
                        GuardMode::Strict => GuardDecision::Redirect(LOGIN_PAGE),
                    },
                }
            }
        }
    }
}

/// Remove any identity headers the client sent
fn strip_identity_headers(headers: &mut HeaderMap) {
    let forged: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with(IDENTITY_HEADER_PREFIX))
        .cloned()
        .collect();
    for name in forged {
        headers.remove(&name);
    }
}

fn insert_identity_headers(headers: &mut HeaderMap, claims: &Claims) {
    headers.insert(
        HeaderName::from_static(HEADER_MATRICULA),
        HeaderValue::from(claims.matricula),
    );
    headers.insert(
        HeaderName::from_static(HEADER_ROLE),
        HeaderValue::from_static(claims.role.as_str()),
    );
    // Names may carry non-ASCII characters; header values allow raw UTF-8 bytes
    for (name, value) in [(HEADER_NOME, &claims.nome), (HEADER_EMAIL, &claims.email)] {
        if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}

/// Axum middleware applying the route guard to every request
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    strip_identity_headers(request.headers_mut());

    let token = extract_token(request.headers(), &state.config.auth.cookie_name);
    let path = request.uri().path().to_string();
    let decision = state.guard.decide(&path, token.as_deref());

    tracing::debug!(
        path = %path,
        decision = decision.label(),
        has_token = token.is_some(),
        "Route guard"
    );

    match decision {
        GuardDecision::Proceed => next.run(request).await,
        GuardDecision::ProceedWithIdentity(claims) => {
            insert_identity_headers(request.headers_mut(), &claims);
            next.run(request).await
        }
        GuardDecision::Redirect(location) => Redirect::temporary(location).into_response(),
        GuardDecision::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

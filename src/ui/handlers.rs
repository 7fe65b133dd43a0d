//! Page handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::context;

use super::{sidebar_for, Assets, Identity};
use crate::api::AppState;
use crate::auth::middleware::LANDING_PAGE;
use crate::error::Result;

/// Render a page inside the shared layout
fn render_page(
    state: &AppState,
    headers: &HeaderMap,
    template: &str,
    title: &str,
    active: &str,
) -> Result<Html<String>> {
    render_listing(state, headers, template, title, active, "", &[])
}

/// Render a page, with the resource and columns an admin list fetches
fn render_listing(
    state: &AppState,
    headers: &HeaderMap,
    template: &str,
    title: &str,
    active: &str,
    resource: &str,
    columns: &[&str],
) -> Result<Html<String>> {
    let identity = Identity::from_headers(headers);
    let sidebar = sidebar_for(identity.as_ref().map(|i| i.role));
    let html = state.pages.render(
        template,
        context! {
            title => title,
            active => active,
            identity => identity,
            sidebar => sidebar,
            resource => resource,
            columns => columns,
        },
    )?;
    Ok(Html(html))
}

pub async fn root() -> Redirect {
    Redirect::temporary(LANDING_PAGE)
}

pub async fn login_page(State(state): State<AppState>) -> Result<Html<String>> {
    let html = state.pages.render("login.html", context! { title => "Entrar" })?;
    Ok(Html(html))
}

pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Result<Html<String>> {
    render_page(&state, &headers, "dashboard.html", "Dashboard", "/user/dashboard")
}

pub async fn challenges(State(state): State<AppState>, headers: HeaderMap) -> Result<Html<String>> {
    render_page(&state, &headers, "section.html", "Meus Desafios", "/user/desafios")
}

pub async fn critical_risks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    render_page(&state, &headers, "section.html", "Riscos Críticos", "/user/riscos-criticos")
}

pub async fn accident_scope(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    render_page(
        &state,
        &headers,
        "section.html",
        "Abrangência de Acidentes",
        "/user/abrangencia-acidentes",
    )
}

pub async fn admin_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    render_listing(
        &state,
        &headers,
        "admin_list.html",
        "Gerenciar Usuários",
        "/admin/usuarios",
        "usuarios",
        &["matricula", "nome", "email", "telefone", "role", "status"],
    )
}

pub async fn admin_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    render_listing(
        &state,
        &headers,
        "admin_list.html",
        "Gerenciar Grupos",
        "/admin/grupos",
        "grupos",
        &["id", "grupo", "nome", "desafiado", "status"],
    )
}

pub async fn admin_contracts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    render_listing(
        &state,
        &headers,
        "admin_list.html",
        "Gerenciar Contratos",
        "/admin/contratos",
        "contratos",
        &["id", "codigo", "descricao", "data_inicio", "data_fim", "status"],
    )
}

/// Embedded stylesheet and scripts
pub async fn static_asset(Path(path): Path<String>) -> Response {
    let Some(file) = Assets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let content_type = match path.rsplit('.').next() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    ([(header::CONTENT_TYPE, content_type)], file.data).into_response()
}

pub async fn not_found(State(state): State<AppState>) -> Response {
    match state.pages.render("not_found.html", context! { title => "Página não encontrada" }) {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => e.into_response(),
    }
}

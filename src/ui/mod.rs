//! Server-rendered pages

mod handlers;
mod sidebar;

pub use handlers::*;
pub use sidebar::{sidebar_for, MenuItem, MenuSection, ADMIN_MENU, USER_MENU};

use axum::http::HeaderMap;
use minijinja::Environment;
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::auth::middleware::{HEADER_EMAIL, HEADER_MATRICULA, HEADER_NOME, HEADER_ROLE};
use crate::auth::Role;
use crate::error::Result;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Templates;

#[derive(RustEmbed)]
#[folder = "static/"]
pub(crate) struct Assets;

/// Template environment backed by the embedded templates
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_loader(|name| {
            Ok(Templates::get(name).map(|file| String::from_utf8_lossy(&file.data).into_owned()))
        });
        Self { env }
    }

    pub fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages").finish_non_exhaustive()
    }
}

/// Caller identity forwarded by the route guard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub matricula: i64,
    pub nome: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let text = |name: &str| {
            headers
                .get(name)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        };

        Some(Self {
            matricula: text(HEADER_MATRICULA)?.parse().ok()?,
            nome: text(HEADER_NOME).unwrap_or_default(),
            email: text(HEADER_EMAIL).unwrap_or_default(),
            role: text(HEADER_ROLE)?.parse().ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_MATRICULA, HeaderValue::from_static("12345"));
        headers.insert(HEADER_ROLE, HeaderValue::from_static("gestor"));
        headers.insert(
            HEADER_NOME,
            HeaderValue::from_bytes("Conceição".as_bytes()).unwrap(),
        );

        let identity = Identity::from_headers(&headers).unwrap();
        assert_eq!(identity.matricula, 12345);
        assert_eq!(identity.role, Role::Manager);
        assert_eq!(identity.nome, "Conceição");
        assert_eq!(identity.email, "");
    }

    #[test]
    fn test_identity_requires_matricula_and_role() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ROLE, HeaderValue::from_static("admin"));
        assert!(Identity::from_headers(&headers).is_none());

        headers.insert(HEADER_MATRICULA, HeaderValue::from_static("abc"));
        assert!(Identity::from_headers(&headers).is_none());
    }

    #[test]
    fn test_every_page_template_renders() {
        let pages = Pages::new();
        for name in [
            "login.html",
            "dashboard.html",
            "section.html",
            "admin_list.html",
            "not_found.html",
        ] {
            let html = pages
                .render(
                    name,
                    minijinja::context! {
                        title => "Teste",
                        sidebar => sidebar_for(Some(Role::Admin)),
                        active => "/user/dashboard",
                        resource => "usuarios",
                        columns => vec!["nome"],
                    },
                )
                .unwrap_or_else(|e| panic!("{} failed: {}", name, e));
            assert!(html.contains("Academia de Líderes"), "{} has no title", name);
        }
    }
}

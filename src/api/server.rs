//! HTTP API server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::{route_guard, Role, RouteGuard, TokenIssuer};
use crate::config::{Config, DatabaseBackend};
use crate::error::{attach_internal_details, Error, Result};
use crate::models::NewUser;
use crate::store::{MemoryStore, PostgresStore, Store};
use crate::ui::{self, Pages};

use super::{auth, contracts, groups, roster, routes, users};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub guard: Arc<RouteGuard>,
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        config.validate()?;
        let tokens = Arc::new(TokenIssuer::new(
            config.auth.jwt_secret.as_bytes(),
            config.token_ttl(),
        ));
        let guard = Arc::new(RouteGuard::new(tokens.clone(), config.guard.mode));

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            guard,
            pages: Arc::new(Pages::new()),
        })
    }
}

/// Open the configured backend, applying the schema for PostgreSQL
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseBackend::Postgres => {
            let url = config.database.url.as_deref().ok_or_else(|| {
                Error::Config("database.url is required for the postgres backend".to_string())
            })?;
            let store = PostgresStore::connect(url, config.database.timeout_secs).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Create the configured bootstrap admin if it does not exist yet
pub async fn seed_bootstrap_admin(state: &AppState) -> Result<()> {
    let Some(admin) = state.config.bootstrap_admin.clone() else {
        return Ok(());
    };
    if state.store.get_user(admin.matricula).await?.is_some() {
        return Ok(());
    }

    let payload = NewUser {
        matricula: admin.matricula,
        nome: admin.nome,
        email: admin.email,
        telefone: admin.telefone,
        role: Some(Role::Admin),
        ..NewUser::default()
    };
    let user = users::provision_user(state.store.as_ref(), &state.config.auth, payload).await?;
    tracing::info!(matricula = user.matricula, "Bootstrap admin created");
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let expose_details = state.config.server.environment.is_development();

    Router::new()
        // API routes
        .route("/api/health", get(routes::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard/stats", get(routes::dashboard_stats))
        .route(
            "/api/usuarios",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/usuarios/{matricula}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route(
            "/api/grupos",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/api/grupos/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::deactivate_group),
        )
        .route(
            "/api/contratos",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route(
            "/api/contratos/{id}",
            get(contracts::get_contract)
                .put(contracts::update_contract)
                .delete(contracts::deactivate_contract),
        )
        .route(
            "/api/rm-apoio",
            get(roster::search_roster).fallback(roster::method_not_allowed),
        )
        .route(
            "/api/rm-apoio/{chapa}",
            get(roster::get_roster_entry).fallback(roster::method_not_allowed),
        )
        // UI routes
        .route("/", get(ui::root))
        .route("/login", get(ui::login_page))
        .route("/user/dashboard", get(ui::dashboard))
        .route("/user/desafios", get(ui::challenges))
        .route("/user/riscos-criticos", get(ui::critical_risks))
        .route("/user/abrangencia-acidentes", get(ui::accident_scope))
        .route("/admin/usuarios", get(ui::admin_users))
        .route("/admin/grupos", get(ui::admin_groups))
        .route("/admin/contratos", get(ui::admin_contracts))
        .route("/static/{*path}", get(ui::static_asset))
        .fallback(ui::not_found)
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(middleware::map_response_with_state(
            expose_details,
            attach_internal_details,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the application on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let store = open_store(&config).await?;
    let state = AppState::new(config, store)?;
    seed_bootstrap_admin(&state).await?;

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(
        "Server listening on {} (guard: {:?})",
        addr,
        state.guard.mode()
    );

    serve(listener, state).await
}

//! Shared helpers: an in-process server on an ephemeral port over the memory store

#![allow(dead_code)]

use std::sync::Arc;

use academia::api::{serve, AppState};
use academia::auth::password;
use academia::auth::Role;
use academia::config::{Config, GuardMode};
use academia::models::User;
use academia::store::{MemoryStore, Store};
use serde_json::{json, Value};

pub const TEST_PASSWORD: &str = "segredo123";

pub fn test_config(mode: GuardMode) -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config.guard.mode = mode;
    config
}

pub struct TestServer {
    pub base: String,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(test_config(GuardMode::Advisory)).await
    }

    pub async fn start_with(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone()).expect("valid test config");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(serve(listener, state.clone()));

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("client");

        Self {
            base: format!("http://{}", addr),
            store,
            state,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Insert an active user whose password is already personal
    pub async fn seed_user(&self, matricula: i64, role: Role) -> User {
        let digest = password::hash(TEST_PASSWORD, 4).expect("hash");
        let mut user = User::new(
            matricula,
            format!("Usuário {}", matricula),
            format!("user{}@example.com", matricula),
            phone_for(matricula),
            role,
            digest,
        );
        user.pass_sub = true;
        self.store.insert_user(user).await.expect("insert user")
    }

    pub async fn login(&self, phone: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "telefone": phone, "password": password }))
            .send()
            .await
            .expect("login request")
    }

    /// Log in a seeded user and return its token
    pub async fn token_for(&self, matricula: i64) -> String {
        let response = self.login(&phone_for(matricula), TEST_PASSWORD).await;
        assert_eq!(response.status(), 200, "login for {} failed", matricula);
        let body: Value = response.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("GET request")
    }

    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Value,
    ) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("JSON request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("DELETE request")
    }
}

/// Deterministic valid phone for a matricula
pub fn phone_for(matricula: i64) -> String {
    format!("+55119{:08}", matricula)
}

//! Authentication integration tests
//!
//! Login, default-password handling, session lookup and logout over HTTP.
//!
//! Run with: cargo test --test auth_tests

mod common;

use academia::api::users::provision_user;
use academia::auth::Role;
use academia::models::NewUser;
use common::{phone_for, TestServer, TEST_PASSWORD};
use reqwest::{header, Method};
use serde_json::{json, Value};

async fn provision(server: &TestServer, matricula: i64, phone: &str, role: Role) {
    let payload = NewUser {
        matricula,
        nome: "Maria Silva".to_string(),
        email: "maria@example.com".to_string(),
        telefone: phone.to_string(),
        role: Some(role),
        ..NewUser::default()
    };
    provision_user(
        server.state.store.as_ref(),
        &server.state.config.auth,
        payload,
    )
    .await
    .expect("provision user");
}

#[tokio::test]
async fn test_login_with_initial_password() {
    let server = TestServer::start().await;
    provision(&server, 12345, "+5511999999999", Role::User).await;

    let response = server.login("+5511999999999", "acad12345").await;
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("auth-token="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["matricula"], 12345);
    assert_eq!(body["user"]["role"], "usuario");

    let raw = body.to_string();
    assert!(!raw.contains("password_hash"));
    assert!(!raw.contains("$2"), "no bcrypt digest in the response");

    // A standard user cannot list users
    let token = body["token"].as_str().unwrap();
    let response = server.get("/api/usuarios", Some(token)).await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_initial_password_is_single_use() {
    let server = TestServer::start().await;
    provision(&server, 777, "+5511988887777", Role::User).await;

    let first = server.login("+5511988887777", "acad777").await;
    assert_eq!(first.status(), 200);

    let second = server.login("+5511988887777", "acad777").await;
    assert_eq!(second.status(), 401);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Senha padrão já utilizada"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initial_password_logins_succeed_once() {
    let server = std::sync::Arc::new(TestServer::start().await);
    provision(&server, 4242, "+5511944444242", Role::User).await;

    let logins: Vec<_> = (0..16)
        .map(|_| {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .login("+5511944444242", "acad4242")
                    .await
                    .status()
                    .as_u16()
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for login in logins {
        statuses.push(login.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 401).count(), 15);
}

#[tokio::test]
async fn test_changed_password_replaces_initial_one() {
    let server = TestServer::start().await;
    provision(&server, 900, "+5511977779000", Role::User).await;

    let body: Value = server
        .login("+5511977779000", "acad900")
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let response = server
        .send_json(
            Method::PUT,
            "/api/usuarios/900",
            &token,
            json!({ "password": "nova-senha" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    assert_eq!(server.login("+5511977779000", "acad900").await.status(), 401);
    assert_eq!(server.login("+5511977779000", "nova-senha").await.status(), 200);
    // The personal password can be reused freely
    assert_eq!(server.login("+5511977779000", "nova-senha").await.status(), 200);
}

#[tokio::test]
async fn test_login_phone_is_normalized() {
    let server = TestServer::start().await;
    server.seed_user(41, Role::User).await;

    let response = server.login("+55 (11) 9000-00041", TEST_PASSWORD).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_login_errors() {
    let server = TestServer::start().await;
    server.seed_user(42, Role::User).await;

    let missing = server.login("", TEST_PASSWORD).await;
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["message"], "Telefone e senha são obrigatórios");

    let wrong = server.login(&phone_for(42), "errada").await;
    assert_eq!(wrong.status(), 401);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["message"], "Credenciais inválidas");

    let unknown = server.login("+5511911112222", TEST_PASSWORD).await;
    assert_eq!(unknown.status(), 401);

    let malformed = server
        .client
        .post(server.url("/api/auth/login"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in() {
    let server = TestServer::start().await;
    server.seed_user(1, Role::Admin).await;
    server.seed_user(50, Role::User).await;
    let admin = server.token_for(1).await;

    let response = server
        .send_json(
            Method::PUT,
            "/api/usuarios/50",
            &admin,
            json!({ "status": "inativo" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = server.login(&phone_for(50), TEST_PASSWORD).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_token_of_deactivated_user_stops_working() {
    let server = TestServer::start().await;
    server.seed_user(1, Role::Admin).await;
    server.seed_user(51, Role::User).await;
    let admin = server.token_for(1).await;
    let user = server.token_for(51).await;

    assert_eq!(server.get("/api/auth/me", Some(&user)).await.status(), 200);
    assert_eq!(server.delete("/api/usuarios/51", &admin).await.status(), 200);
    assert_eq!(server.get("/api/auth/me", Some(&user)).await.status(), 401);
}

#[tokio::test]
async fn test_me_and_token_sources() {
    let server = TestServer::start().await;
    server.seed_user(60, Role::Manager).await;
    let token = server.token_for(60).await;

    let response = server.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["matricula"], 60);
    assert_eq!(body["user"]["role"], "gestor");

    // The session cookie works as well as the bearer header
    let response = server
        .client
        .get(server.url("/api/auth/me"))
        .header(header::COOKIE, format!("auth-token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server.get("/api/auth/me", None).await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token não fornecido");

    let response = server.get("/api/auth/me", Some("not-a-token")).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("auth-token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

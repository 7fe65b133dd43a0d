//! CRUD tests for users, groups, contracts and the roster
//!
//! Run with: cargo test --test api_crud_tests

mod common;

use academia::auth::Role;
use academia::models::RosterEntry;
use common::TestServer;
use reqwest::Method;
use serde_json::{json, Value};

async fn admin_server() -> (TestServer, String) {
    let server = TestServer::start().await;
    server.seed_user(1, Role::Admin).await;
    let token = server.token_for(1).await;
    (server, token)
}

async fn create_group(server: &TestServer, token: &str, name: &str) -> i64 {
    let response = server
        .send_json(Method::POST, "/api/grupos", token, json!({ "nome": name }))
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_admin_creates_and_lists_users() {
    let (server, admin) = admin_server().await;
    let group = create_group(&server, &admin, "Turma A").await;

    let response = server
        .send_json(
            Method::POST,
            "/api/usuarios",
            &admin,
            json!({
                "matricula": 200,
                "nome": "Ana Souza",
                "email": "ana@example.com",
                "telefone": "+55 (11) 98888-0200",
                "role": "gestor",
                "grupo_id": group,
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["telefone"], "+5511988880200");
    assert_eq!(body["data"]["status"], "ativo");

    let response = server.get("/api/usuarios?role=gestor", Some(&admin)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["nome"], "Ana Souza");
    assert_eq!(users[0]["grupos"]["nome"], "Turma A");
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_user_creation_validation() {
    let (server, admin) = admin_server().await;

    let missing = server
        .send_json(Method::POST, "/api/usuarios", &admin, json!({ "nome": "Sem dados" }))
        .await;
    assert_eq!(missing.status(), 400);

    let bad_email = server
        .send_json(
            Method::POST,
            "/api/usuarios",
            &admin,
            json!({
                "matricula": 300,
                "nome": "Carlos",
                "email": "carlos-at-example",
                "telefone": "+5511977770300",
            }),
        )
        .await;
    assert_eq!(bad_email.status(), 400);

    let unknown_group = server
        .send_json(
            Method::POST,
            "/api/usuarios",
            &admin,
            json!({
                "matricula": 301,
                "nome": "Carla",
                "email": "carla@example.com",
                "telefone": "+5511977770301",
                "grupo_id": 9999,
            }),
        )
        .await;
    assert_eq!(unknown_group.status(), 400);
    let body: Value = unknown_group.json().await.unwrap();
    assert_eq!(body["message"], "Grupo não encontrado");

    // Phone already taken by the admin
    let duplicate = server
        .send_json(
            Method::POST,
            "/api/usuarios",
            &admin,
            json!({
                "matricula": 302,
                "nome": "Duplicado",
                "email": "dup@example.com",
                "telefone": common::phone_for(1),
            }),
        )
        .await;
    assert_eq!(duplicate.status(), 400);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["message"], "Telefone já cadastrado");
}

#[tokio::test]
async fn test_users_only_reach_their_own_record() {
    let server = TestServer::start().await;
    server.seed_user(10, Role::User).await;
    server.seed_user(11, Role::User).await;
    let token = server.token_for(10).await;

    assert_eq!(server.get("/api/usuarios/10", Some(&token)).await.status(), 200);
    assert_eq!(server.get("/api/usuarios/11", Some(&token)).await.status(), 403);
    assert_eq!(server.get("/api/usuarios", Some(&token)).await.status(), 403);
    assert_eq!(server.delete("/api/usuarios/11", &token).await.status(), 403);
}

#[tokio::test]
async fn test_non_admin_cannot_change_admin_fields() {
    let server = TestServer::start().await;
    server.seed_user(20, Role::User).await;
    let token = server.token_for(20).await;

    let response = server
        .send_json(Method::PUT, "/api/usuarios/20", &token, json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status(), 403);

    let response = server
        .send_json(
            Method::PUT,
            "/api/usuarios/20",
            &token,
            json!({ "nome": "Novo Nome" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["nome"], "Novo Nome");

    let response = server
        .send_json(Method::PUT, "/api/usuarios/20", &token, json!({ "apelido": "x" }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .send_json(Method::PUT, "/api/usuarios/20", &token, json!({ "password": "123" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let (server, admin) = admin_server().await;
    assert_eq!(server.get("/api/usuarios/4242", Some(&admin)).await.status(), 404);
    assert_eq!(server.delete("/api/usuarios/4242", &admin).await.status(), 404);
}

// ============================================================================
// Groups
// ============================================================================

#[tokio::test]
async fn test_group_lifecycle() {
    let (server, admin) = admin_server().await;
    let id = create_group(&server, &admin, "Liderança Norte").await;

    let response = server.get(&format!("/api/grupos/{}", id), Some(&admin)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["grupo"], "Liderança Norte");
    assert_eq!(body["data"]["usuarios"].as_array().unwrap().len(), 0);

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/grupos/{}", id),
            &admin,
            json!({ "desafiado": true }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["desafiado"], true);

    let response = server.delete(&format!("/api/grupos/{}", id), &admin).await;
    assert_eq!(response.status(), 200);

    let body: Value = server
        .get(&format!("/api/grupos/{}", id), Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "inativo");
}

#[tokio::test]
async fn test_group_with_active_members_cannot_be_deactivated() {
    let (server, admin) = admin_server().await;
    let id = create_group(&server, &admin, "Turma B").await;

    server.seed_user(30, Role::User).await;
    let response = server
        .send_json(
            Method::PUT,
            "/api/usuarios/30",
            &admin,
            json!({ "grupo_id": id }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = server.delete(&format!("/api/grupos/{}", id), &admin).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Não é possível desativar grupo com usuários ativos");

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/grupos/{}", id),
            &admin,
            json!({ "status": "inativo" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Once the member is inactive the group can go
    assert_eq!(server.delete("/api/usuarios/30", &admin).await.status(), 200);
    let response = server.delete(&format!("/api/grupos/{}", id), &admin).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_group_writes_require_admin() {
    let server = TestServer::start().await;
    server.seed_user(40, Role::Manager).await;
    let token = server.token_for(40).await;

    let response = server
        .send_json(Method::POST, "/api/grupos", &token, json!({ "nome": "X" }))
        .await;
    assert_eq!(response.status(), 403);
    assert_eq!(server.get("/api/grupos", Some(&token)).await.status(), 200);

    let response = server
        .send_json(Method::POST, "/api/grupos", &token, json!({}))
        .await;
    assert_eq!(response.status(), 403);
}

// ============================================================================
// Contracts
// ============================================================================

#[tokio::test]
async fn test_contract_lifecycle() {
    let (server, admin) = admin_server().await;
    let group = create_group(&server, &admin, "Operações").await;

    let response = server
        .send_json(
            Method::POST,
            "/api/contratos",
            &admin,
            json!({
                "codigo": "CT-001",
                "descricao": "Manutenção industrial",
                "valor": 150000.5,
                "data_inicio": "2024-01-01",
                "data_fim": "2024-12-31",
                "grupo_id": group,
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "ativo");

    let body: Value = server
        .get(&format!("/api/contratos/{}", id), Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["codigo"], "CT-001");
    assert_eq!(body["data"]["grupos"]["nome"], "Operações");

    // An end date before the stored start is refused
    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/contratos/{}", id),
            &admin,
            json!({ "data_fim": "2023-06-30" }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Data de fim deve ser posterior à data de início");

    let response = server.delete(&format!("/api/contratos/{}", id), &admin).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_contract_creation_validation() {
    let (server, admin) = admin_server().await;

    let response = server
        .send_json(
            Method::POST,
            "/api/contratos",
            &admin,
            json!({ "codigo": "CT-002" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .send_json(
            Method::POST,
            "/api/contratos",
            &admin,
            json!({
                "codigo": "CT-003",
                "descricao": "Período invertido",
                "data_inicio": "2024-05-01",
                "data_fim": "2024-05-01",
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .send_json(
            Method::POST,
            "/api/contratos",
            &admin,
            json!({
                "codigo": "CT-004",
                "descricao": "Grupo inexistente",
                "grupo_id": 404,
            }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Grupo não encontrado");
}

// ============================================================================
// Roster and dashboard
// ============================================================================

#[tokio::test]
async fn test_roster_search_for_staff_only() {
    let server = TestServer::start().await;
    server.seed_user(1, Role::Admin).await;
    server.seed_user(2, Role::User).await;
    for i in 0..12 {
        server
            .store
            .insert_roster_entry(RosterEntry {
                chapa_matricula: format!("{:05}", i),
                nome: format!("Colaborador {}", i),
                cod_funcao: None,
                funcao: Some("Técnico".to_string()),
                cod_equipe: None,
                equipe: None,
                cod_situacao: Some("A".to_string()),
                data_nasc: None,
                data_admissao: None,
            })
            .await;
    }
    let admin = server.token_for(1).await;
    let user = server.token_for(2).await;

    let body: Value = server
        .get("/api/rm-apoio?search=colaborador", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let response = server.get("/api/rm-apoio/00003", Some(&admin)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["nome"], "Colaborador 3");

    assert_eq!(server.get("/api/rm-apoio/99999", Some(&admin)).await.status(), 404);
    assert_eq!(server.get("/api/rm-apoio", Some(&user)).await.status(), 403);
}

#[tokio::test]
async fn test_roster_is_read_only() {
    let (server, admin) = admin_server().await;
    let response = server
        .send_json(Method::POST, "/api/rm-apoio", &admin, json!({}))
        .await;
    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Operação não permitida nesta rota");

    assert_eq!(server.delete("/api/rm-apoio/00001", &admin).await.status(), 405);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let (server, admin) = admin_server().await;
    create_group(&server, &admin, "Turma C").await;
    server.seed_user(5, Role::User).await;

    let response = server.get("/api/dashboard/stats", Some(&admin)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalUsuarios"], 2);
    assert_eq!(body["data"]["totalGrupos"], 1);
    assert_eq!(body["data"]["totalContratos"], 0);

    assert_eq!(server.get("/api/dashboard/stats", None).await.status(), 401);
}

//! Testes de roteamento: autenticação e envelopes de erro, sem banco.
//!
//! O pool é preguiçoso; nenhuma rota exercitada aqui chega a abrir conexão.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use pharma_backend::{
    build_router,
    config::{AppState, Config},
    models::auth::Claims,
};

const SECRET: &str = "segredo-de-teste";

fn test_app() -> Router {
    let config = Config {
        database_url: "postgres://localhost/unused".into(),
        jwt_secret: SECRET.into(),
        bind_addr: "127.0.0.1:0".into(),
        database_max_connections: 1,
        access_token_ttl_minutes: 30,
        refresh_token_ttl_days: 7,
        password_reset_expose_token: false,
        bootstrap_admin: None,
    };
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    build_router(AppState::from_parts(config, pool))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = test_app().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = test_app().oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = json_body(response).await;
    assert!(doc["paths"]["/api/v1/roles/{id}/permissions/{code}"].is_object());
    assert!(doc["paths"]["/api/v1/dispatches"]["post"].is_object());
    assert!(doc["paths"]["/api/v1/stock/alerts"].is_object());
    assert!(doc["components"]["securitySchemes"]["api_jwt"].is_object());
}

#[tokio::test]
async fn missing_token_is_not_authenticated() {
    let response = test_app().oneshot(get("/api/v1/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn garbage_token_is_invalid() {
    let request = Request::builder()
        .uri("/api/v1/roles")
        .header(header::AUTHORIZATION, "Bearer nao-e-um-jwt")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error_code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_invalid() {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "intruso@pharmacy.com".into(),
        role: Some("super_admin".into()),
        warehouse_id: None,
        shop_id: None,
        iat: now,
        exp: now + 600,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"outro-segredo")).unwrap();

    let request = Request::builder()
        .uri("/api/v1/stock/movements")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error_code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn login_payload_is_validated_before_any_lookup() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "nao-e-email", "password": ""}"#))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["details"]["email"].is_array());
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn dispatch_routes_require_a_token() {
    let response = test_app().oneshot(get("/api/v1/dispatches")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_is_public_and_validated() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/password-reset/confirm")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"token": "", "new_password": "curta"}"#))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["details"]["token"].is_array());
    assert!(body["details"]["new_password"].is_array());
}

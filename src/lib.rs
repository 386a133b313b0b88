// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

/// Monta o roteador completo sobre o estado já construído.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let public_auth_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/password-reset/request", post(handlers::auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(handlers::auth::confirm_password_reset));

    // Tudo abaixo passa pelo auth_guard
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/auth/logout", post(handlers::auth::logout))
        // RBAC
        .route("/permissions", get(handlers::rbac::list_permissions))
        .route(
            "/roles",
            get(handlers::rbac::list_roles).post(handlers::rbac::create_role),
        )
        .route(
            "/roles/{id}",
            get(handlers::rbac::get_role)
                .put(handlers::rbac::update_role)
                .delete(handlers::rbac::delete_role),
        )
        .route(
            "/roles/{id}/permissions/{code}",
            post(handlers::rbac::grant_permission).delete(handlers::rbac::revoke_permission),
        )
        // Usuários
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::deactivate_user),
        )
        // Armazéns e lojas
        .route(
            "/warehouses",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/warehouses/{id}",
            get(handlers::warehouses::get_warehouse)
                .put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .route("/warehouses/{id}/shops", get(handlers::warehouses::list_warehouse_shops))
        .route(
            "/shops",
            get(handlers::shops::list_shops).post(handlers::shops::create_shop),
        )
        .route(
            "/shops/{id}",
            get(handlers::shops::get_shop)
                .put(handlers::shops::update_shop)
                .delete(handlers::shops::delete_shop),
        )
        // Catálogo
        .route(
            "/medicines",
            get(handlers::medicines::list_medicines).post(handlers::medicines::create_medicine),
        )
        .route(
            "/medicines/{id}",
            get(handlers::medicines::get_medicine).put(handlers::medicines::update_medicine),
        )
        .route(
            "/medicines/{id}/batches",
            get(handlers::medicines::list_batches).post(handlers::medicines::create_batch),
        )
        // Estoque
        .route("/stock/warehouses/{id}", get(handlers::inventory::get_warehouse_stock))
        .route("/stock/warehouses/{id}/entry", post(handlers::inventory::stock_entry))
        .route("/stock/shops/{id}", get(handlers::inventory::get_shop_stock))
        .route("/stock/adjust", post(handlers::inventory::adjust_stock))
        .route("/stock/movements", get(handlers::inventory::list_movements))
        .route("/stock/alerts", get(handlers::inventory::list_alerts))
        // Remessas
        .route(
            "/dispatches",
            get(handlers::dispatches::list_dispatches).post(handlers::dispatches::create_dispatch),
        )
        .route("/dispatches/{id}", get(handlers::dispatches::get_dispatch))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let api_v1 = public_auth_routes.merge(protected_routes);

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

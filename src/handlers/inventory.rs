// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        response::{ApiResponse, PageParams, Paginated},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::inventory::{
        AdjustStockPayload, AlertFilter, MovementFilter, StockAlert, StockEntryPayload, StockLevel, StockLocation,
        StockMovement,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/stock/warehouses/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do armazém"), PageParams),
    responses(
        (status = 200, description = "Estoque do armazém por lote", body = Vec<StockLevel>),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Armazém não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_warehouse_stock(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<StockLevel>>, AppError> {
    page.validate()?;
    let stock = app_state
        .inventory_service
        .get_stock(&caller, StockLocation::Warehouse, id, page)
        .await?;
    Ok(Json(stock))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/shops/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID da loja"), PageParams),
    responses(
        (status = 200, description = "Estoque da loja por lote", body = Vec<StockLevel>),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Loja não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_shop_stock(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<StockLevel>>, AppError> {
    page.validate()?;
    let stock = app_state
        .inventory_service
        .get_stock(&caller, StockLocation::Shop, id, page)
        .await?;
    Ok(Json(stock))
}

// Entrada de fornecedor
#[utoipa::path(
    post,
    path = "/api/v1/stock/warehouses/{id}/entry",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do armazém")),
    request_body = StockEntryPayload,
    responses(
        (status = 201, description = "Entrada registrada", body = StockLevel),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Armazém ou lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn stock_entry(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockEntryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let level = app_state.inventory_service.stock_entry(&caller, id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Entrada registrada", level))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock/adjust",
    tag = "Inventory",
    request_body = AdjustStockPayload,
    responses(
        (status = 200, description = "Estoque ajustado", body = StockLevel),
        (status = 400, description = "Ajuste deixaria o estoque negativo"),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Linha de estoque não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<Json<ApiResponse<StockLevel>>, AppError> {
    payload.validate()?;
    let level = app_state.inventory_service.adjust_stock(&caller, payload).await?;
    Ok(Json(ApiResponse::with_message("Estoque ajustado", level)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    tag = "Inventory",
    params(MovementFilter, PageParams),
    responses(
        (status = 200, description = "Movimentações no escopo do chamador", body = Vec<StockMovement>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<MovementFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<StockMovement>>, AppError> {
    page.validate()?;
    let movements = app_state
        .inventory_service
        .list_movements(&caller, filter, page)
        .await?;
    Ok(Json(movements))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/alerts",
    tag = "Inventory",
    params(AlertFilter),
    responses(
        (status = 200, description = "Estoque baixo, perto do vencimento (60 dias) e vencido", body = Vec<StockAlert>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<AlertFilter>,
) -> Result<Json<ApiResponse<Vec<StockAlert>>>, AppError> {
    let alerts = app_state.inventory_service.list_alerts(&caller, filter).await?;
    Ok(Json(ApiResponse::ok(alerts)))
}

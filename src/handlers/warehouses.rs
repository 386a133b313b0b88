// src/handlers/warehouses.rs

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
    models::organization::{
        CreateWarehousePayload, MedicalShop, UpdateWarehousePayload, WarehouseDetail, WarehouseFilter,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    tag = "Warehouses",
    params(WarehouseFilter, PageParams),
    responses(
        (status = 200, description = "Armazéns visíveis no escopo do chamador", body = Vec<WarehouseDetail>),
        (status = 403, description = "Sem permissão warehouses.view")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_warehouses(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<WarehouseFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<WarehouseDetail>>, AppError> {
    page.validate()?;
    let warehouses = app_state
        .organization_service
        .list_warehouses(&caller, filter, page)
        .await?;
    Ok(Json(warehouses))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}",
    tag = "Warehouses",
    params(("id" = Uuid, Path, description = "ID do armazém")),
    responses(
        (status = 200, description = "Armazém com quantidade de lojas", body = WarehouseDetail),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Armazém não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_warehouse(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WarehouseDetail>>, AppError> {
    let warehouse = app_state.organization_service.get_warehouse(&caller, id).await?;
    Ok(Json(ApiResponse::ok(warehouse)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    tag = "Warehouses",
    request_body = CreateWarehousePayload,
    responses(
        (status = 201, description = "Armazém criado", body = WarehouseDetail),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_warehouse(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateWarehousePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let warehouse = app_state.organization_service.create_warehouse(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Armazém criado", warehouse))))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/{id}",
    tag = "Warehouses",
    params(("id" = Uuid, Path, description = "ID do armazém")),
    request_body = UpdateWarehousePayload,
    responses(
        (status = 200, description = "Armazém atualizado", body = WarehouseDetail),
        (status = 404, description = "Armazém não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_warehouse(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWarehousePayload>,
) -> Result<Json<ApiResponse<WarehouseDetail>>, AppError> {
    payload.validate()?;
    let warehouse = app_state
        .organization_service
        .update_warehouse(&caller, id, payload)
        .await?;
    Ok(Json(ApiResponse::with_message("Armazém atualizado", warehouse)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{id}",
    tag = "Warehouses",
    params(("id" = Uuid, Path, description = "ID do armazém")),
    responses(
        (status = 200, description = "Armazém excluído"),
        (status = 409, description = "Armazém com lojas vinculadas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_warehouse(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.organization_service.delete_warehouse(&caller, id).await?;
    Ok(Json(ApiResponse::empty("Armazém excluído")))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}/shops",
    tag = "Warehouses",
    params(("id" = Uuid, Path, description = "ID do armazém"), PageParams),
    responses(
        (status = 200, description = "Lojas abastecidas pelo armazém", body = Vec<MedicalShop>),
        (status = 404, description = "Armazém não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_warehouse_shops(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<MedicalShop>>, AppError> {
    page.validate()?;
    let shops = app_state
        .organization_service
        .list_warehouse_shops(&caller, id, page)
        .await?;
    Ok(Json(shops))
}

// src/handlers/shops.rs

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
    models::organization::{CreateShopPayload, MedicalShop, ShopFilter, UpdateShopPayload},
};

#[utoipa::path(
    get,
    path = "/api/v1/shops",
    tag = "Shops",
    params(ShopFilter, PageParams),
    responses(
        (status = 200, description = "Lojas visíveis no escopo do chamador", body = Vec<MedicalShop>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_shops(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<ShopFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<MedicalShop>>, AppError> {
    page.validate()?;
    let shops = app_state.organization_service.list_shops(&caller, filter, page).await?;
    Ok(Json(shops))
}

#[utoipa::path(
    get,
    path = "/api/v1/shops/{id}",
    tag = "Shops",
    params(("id" = Uuid, Path, description = "ID da loja")),
    responses(
        (status = 200, description = "Loja", body = MedicalShop),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Loja não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_shop(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MedicalShop>>, AppError> {
    let shop = app_state.organization_service.get_shop(&caller, id).await?;
    Ok(Json(ApiResponse::ok(shop)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shops",
    tag = "Shops",
    request_body = CreateShopPayload,
    responses(
        (status = 201, description = "Loja criada", body = MedicalShop),
        (status = 404, description = "Armazém não encontrado"),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_shop(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateShopPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let shop = app_state.organization_service.create_shop(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Loja criada", shop))))
}

#[utoipa::path(
    put,
    path = "/api/v1/shops/{id}",
    tag = "Shops",
    params(("id" = Uuid, Path, description = "ID da loja")),
    request_body = UpdateShopPayload,
    responses(
        (status = 200, description = "Loja atualizada", body = MedicalShop),
        (status = 404, description = "Loja não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_shop(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShopPayload>,
) -> Result<Json<ApiResponse<MedicalShop>>, AppError> {
    payload.validate()?;
    let shop = app_state.organization_service.update_shop(&caller, id, payload).await?;
    Ok(Json(ApiResponse::with_message("Loja atualizada", shop)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shops/{id}",
    tag = "Shops",
    params(("id" = Uuid, Path, description = "ID da loja")),
    responses(
        (status = 200, description = "Loja excluída"),
        (status = 409, description = "Loja com usuários ou estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_shop(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.organization_service.delete_shop(&caller, id).await?;
    Ok(Json(ApiResponse::empty("Loja excluída")))
}

// src/handlers/dispatches.rs

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
    models::dispatch::{CreateDispatchPayload, Dispatch, DispatchDetail, DispatchFilter},
};

#[utoipa::path(
    get,
    path = "/api/v1/dispatches",
    tag = "Dispatches",
    params(DispatchFilter, PageParams),
    responses(
        (status = 200, description = "Remessas no escopo do chamador", body = Vec<Dispatch>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_dispatches(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<DispatchFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<Dispatch>>, AppError> {
    page.validate()?;
    let dispatches = app_state
        .dispatch_service
        .list_dispatches(&caller, filter, page)
        .await?;
    Ok(Json(dispatches))
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches/{id}",
    tag = "Dispatches",
    params(("id" = Uuid, Path, description = "ID da remessa")),
    responses(
        (status = 200, description = "Remessa com itens", body = DispatchDetail),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Remessa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dispatch(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DispatchDetail>>, AppError> {
    let dispatch = app_state.dispatch_service.get_dispatch(&caller, id).await?;
    Ok(Json(ApiResponse::ok(dispatch)))
}

// Saída do armazém e entrada na loja numa só operação
#[utoipa::path(
    post,
    path = "/api/v1/dispatches",
    tag = "Dispatches",
    request_body = CreateDispatchPayload,
    responses(
        (status = 201, description = "Remessa despachada", body = DispatchDetail),
        (status = 400, description = "Loja de outro armazém ou estoque insuficiente"),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Armazém, loja, lote ou estoque não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_dispatch(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateDispatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let dispatch = app_state.dispatch_service.create_dispatch(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Remessa despachada", dispatch))))
}

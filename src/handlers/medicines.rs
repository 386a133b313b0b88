// src/handlers/medicines.rs

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
    middleware::rbac::{PermMedicinesCreate, PermMedicinesEdit, PermMedicinesView, RequirePermission},
    models::inventory::{
        Batch, CreateBatchPayload, CreateMedicinePayload, Medicine, MedicineFilter, UpdateMedicinePayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/medicines",
    tag = "Medicines",
    params(MedicineFilter, PageParams),
    responses(
        (status = 200, description = "Catálogo de medicamentos", body = Vec<Medicine>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_medicines(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesView>,
    Query(filter): Query<MedicineFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<Medicine>>, AppError> {
    page.validate()?;
    let medicines = app_state.medicine_service.list_medicines(filter, page).await?;
    Ok(Json(medicines))
}

#[utoipa::path(
    get,
    path = "/api/v1/medicines/{id}",
    tag = "Medicines",
    params(("id" = Uuid, Path, description = "ID do medicamento")),
    responses(
        (status = 200, description = "Medicamento", body = Medicine),
        (status = 404, description = "Medicamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_medicine(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesView>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Medicine>>, AppError> {
    let medicine = app_state.medicine_service.get_medicine(id).await?;
    Ok(Json(ApiResponse::ok(medicine)))
}

#[utoipa::path(
    post,
    path = "/api/v1/medicines",
    tag = "Medicines",
    request_body = CreateMedicinePayload,
    responses(
        (status = 201, description = "Medicamento cadastrado", body = Medicine),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_medicine(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesCreate>,
    Json(payload): Json<CreateMedicinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let medicine = app_state.medicine_service.create_medicine(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Medicamento cadastrado", medicine))))
}

#[utoipa::path(
    put,
    path = "/api/v1/medicines/{id}",
    tag = "Medicines",
    params(("id" = Uuid, Path, description = "ID do medicamento")),
    request_body = UpdateMedicinePayload,
    responses(
        (status = 200, description = "Medicamento atualizado", body = Medicine),
        (status = 404, description = "Medicamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_medicine(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesEdit>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMedicinePayload>,
) -> Result<Json<ApiResponse<Medicine>>, AppError> {
    payload.validate()?;
    let medicine = app_state.medicine_service.update_medicine(id, payload).await?;
    Ok(Json(ApiResponse::with_message("Medicamento atualizado", medicine)))
}

#[utoipa::path(
    get,
    path = "/api/v1/medicines/{id}/batches",
    tag = "Medicines",
    params(("id" = Uuid, Path, description = "ID do medicamento")),
    responses(
        (status = 200, description = "Lotes por validade", body = Vec<Batch>),
        (status = 404, description = "Medicamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_batches(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesView>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Batch>>>, AppError> {
    let batches = app_state.medicine_service.list_batches(id).await?;
    Ok(Json(ApiResponse::ok(batches)))
}

#[utoipa::path(
    post,
    path = "/api/v1/medicines/{id}/batches",
    tag = "Medicines",
    params(("id" = Uuid, Path, description = "ID do medicamento")),
    request_body = CreateBatchPayload,
    responses(
        (status = 201, description = "Lote cadastrado", body = Batch),
        (status = 409, description = "Lote já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_batch(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMedicinesCreate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateBatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let batch = app_state.medicine_service.create_batch(id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Lote cadastrado", batch))))
}

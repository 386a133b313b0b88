// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::rbac::{PermRolesManage, PermRolesView, RequirePermission},
    models::rbac::{CreateRolePayload, Permission, RoleResponse, UpdateRolePayload},
};

// GET /api/v1/permissions (Para o frontend saber o que mostrar na tela de criação)
#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Registro de permissões, por módulo e código", body = Vec<Permission>),
        (status = 403, description = "Sem permissão roles.view")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesView>,
) -> Result<Json<ApiResponse<Vec<Permission>>>, AppError> {
    let permissions = app_state.rbac_service.list_system_permissions().await?;
    Ok(Json(ApiResponse::ok(permissions)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "Cargos com permissões e quantidade de usuários", body = Vec<RoleResponse>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesView>,
) -> Result<Json<ApiResponse<Vec<RoleResponse>>>, AppError> {
    let roles = app_state.rbac_service.list_roles().await?;
    Ok(Json(ApiResponse::ok(roles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses(
        (status = 200, description = "Cargo", body = RoleResponse),
        (status = 404, description = "Cargo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesView>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RoleResponse>>, AppError> {
    let role = app_state.rbac_service.get_role(id).await?;
    Ok(Json(ApiResponse::ok(role)))
}

// POST /api/v1/roles
#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Cargo criado", body = RoleResponse),
        (status = 400, description = "Permissão desconhecida ou incompatível com o tipo do cargo"),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesManage>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let role = app_state.rbac_service.create_role(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Cargo criado", role))))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Cargo atualizado", body = RoleResponse),
        (status = 403, description = "Cargo de sistema"),
        (status = 404, description = "Cargo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<ApiResponse<RoleResponse>>, AppError> {
    payload.validate()?;
    let role = app_state.rbac_service.update_role(id, payload).await?;
    Ok(Json(ApiResponse::with_message("Cargo atualizado", role)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses(
        (status = 200, description = "Cargo excluído"),
        (status = 403, description = "Cargo de sistema"),
        (status = 409, description = "Cargo em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.rbac_service.delete_role(id).await?;
    Ok(Json(ApiResponse::empty("Cargo excluído")))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/{id}/permissions/{code}",
    tag = "RBAC",
    params(
        ("id" = Uuid, Path, description = "ID do cargo"),
        ("code" = String, Path, description = "Código da permissão")
    ),
    responses(
        (status = 201, description = "Permissão concedida", body = RoleResponse),
        (status = 409, description = "O cargo já possui a permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn grant_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesManage>,
    Path((id, code)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let role = app_state.rbac_service.grant_permission(id, &code).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Permissão concedida", role))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}/permissions/{code}",
    tag = "RBAC",
    params(
        ("id" = Uuid, Path, description = "ID do cargo"),
        ("code" = String, Path, description = "Código da permissão")
    ),
    responses(
        (status = 200, description = "Permissão revogada", body = RoleResponse),
        (status = 404, description = "O cargo não possui a permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesManage>,
    Path((id, code)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<RoleResponse>>, AppError> {
    let role = app_state.rbac_service.revoke_permission(id, &code).await?;
    Ok(Json(ApiResponse::with_message("Permissão revogada", role)))
}

// src/handlers/users.rs

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
    models::auth::{CreateUserPayload, UpdateUserPayload, User, UserFilter},
};

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    params(UserFilter, PageParams),
    responses(
        (status = 200, description = "Usuários visíveis no escopo do chamador", body = Vec<User>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Query(filter): Query<UserFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<User>>, AppError> {
    page.validate()?;
    let users = app_state.user_service.list_users(&caller, filter, page).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = app_state.user_service.get_user(&caller, id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 400, description = "Atribuição incompatível com o cargo"),
        (status = 403, description = "Sem permissão ou cargo não atribuível"),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = app_state.user_service.create_user(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Usuário criado", user))))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = User),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    payload.validate()?;
    let user = app_state.user_service.update_user(&caller, id, payload).await?;
    Ok(Json(ApiResponse::with_message("Usuário atualizado", user)))
}

// Exclusão lógica
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário desativado"),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.user_service.deactivate_user(&caller, id).await?;
    Ok(Json(ApiResponse::empty("Usuário desativado")))
}

// src/handlers/auth.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        ClientInfo, LoginUserPayload, MeResponse, PasswordResetConfirmPayload, PasswordResetRequestPayload,
        PasswordResetRequested, RefreshTokenPayload, TokenResponse,
    },
};

// Handler de login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = TokenResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Conta desativada")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    payload.validate()?;

    let tokens = app_state
        .auth_service
        .login_user(payload.email.trim(), &payload.password, &client)
        .await?;

    Ok(Json(ApiResponse::with_message("Login realizado com sucesso", tokens)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "Novo par de tokens", body = TokenResponse),
        (status = 401, description = "Refresh token inválido ou expirado")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    payload.validate()?;
    let tokens = app_state.auth_service.refresh(&payload.refresh_token, &client).await?;
    Ok(Json(ApiResponse::ok(tokens)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/request",
    tag = "Auth",
    request_body = PasswordResetRequestPayload,
    responses(
        (status = 200, description = "Resposta idêntica para e-mail conhecido ou não", body = PasswordResetRequested),
        (status = 400, description = "E-mail inválido")
    )
)]
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<Json<ApiResponse<PasswordResetRequested>>, AppError> {
    payload.validate()?;
    let token = app_state
        .auth_service
        .request_password_reset(payload.email.trim())
        .await?;

    Ok(Json(ApiResponse::ok(PasswordResetRequested {
        message: "Se o e-mail existir, um link de redefinição foi enviado.",
        reset_token: token.filter(|_| app_state.config.password_reset_expose_token),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    tag = "Auth",
    request_body = PasswordResetConfirmPayload,
    responses(
        (status = 200, description = "Senha redefinida; sessões encerradas"),
        (status = 400, description = "Token inválido ou expirado")
    )
)]
pub async fn confirm_password_reset(
    State(app_state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    payload.validate()?;
    app_state
        .auth_service
        .confirm_password_reset(&payload.token, &payload.new_password, &client)
        .await?;
    Ok(Json(ApiResponse::empty("Senha redefinida com sucesso")))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Sessões encerradas"),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    caller: AuthenticatedUser,
    client: ClientInfo,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.auth_service.logout(&caller.user, &client).await?;
    Ok(Json(ApiResponse::empty("Logout realizado com sucesso")))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Perfil e permissões efetivas", body = MeResponse),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(caller): AuthenticatedUser) -> Json<ApiResponse<MeResponse>> {
    let permissions = caller.permissions.codes();
    let is_super_admin = caller.is_super_admin();
    Json(ApiResponse::ok(MeResponse {
        role: caller.role.map(|r| r.name),
        is_super_admin,
        permissions,
        user: caller.user,
    }))
}

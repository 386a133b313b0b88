// src/middleware/auth.rs

use std::{convert::Infallible, ops::Deref};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::ClientInfo,
    services::access::Caller,
};

// O middleware em si: token -> usuário -> cargo -> permissões
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::NotAuthenticated)?;

    let claims = app_state.auth_service.validate_token(bearer.token())?;

    // O token pode sobreviver ao usuário; a conta é sempre relida do banco
    let user = app_state
        .user_repo
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if !user.is_active {
        return Err(AppError::AccountDisabled);
    }

    let (role, permissions) = app_state.rbac_service.resolve(&user).await?;

    request.extensions_mut().insert(AuthenticatedUser(Caller {
        user,
        role,
        permissions,
    }));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Caller);

impl Deref for AuthenticatedUser {
    type Target = Caller;

    fn deref(&self) -> &Caller {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::NotAuthenticated)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        // Primeiro IP da cadeia do proxy
        ip_address: header(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_owned())
            .or_else(|| header(headers, "x-real-ip").map(str::to_owned)),
        user_agent: header(headers, USER_AGENT.as_str()).map(str::to_owned),
    }
}

// IP e user-agent para sessões e auditoria
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(client_info(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_info_prefers_first_forwarded_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let info = client_info(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn client_info_is_empty_without_headers() {
        let info = client_info(&HeaderMap::new());
        assert!(info.ip_address.is_none());
        assert!(info.user_agent.is_none());
    }
}

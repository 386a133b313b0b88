// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::rbac::LegacyRole;

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,

    #[schema(example = "admin@pharmacy.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    #[schema(example = "Maria Souza")]
    pub full_name: String,
    pub phone: Option<String>,

    // Campo antigo, mantido para linhas que ainda não têm role_id
    pub legacy_role: Option<LegacyRole>,
    pub role_id: Option<Uuid>,

    pub assigned_warehouse_id: Option<Uuid>,
    pub assigned_shop_id: Option<Uuid>,

    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// De onde vem o cargo de um usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRef {
    Id(Uuid),
    LegacyName(&'static str),
    Unassigned,
}

impl User {
    /// `role_id` tem prioridade; sem ele, o enum antigo vira nome de cargo.
    pub fn role_ref(&self) -> RoleRef {
        match (self.role_id, self.legacy_role) {
            (Some(id), _) => RoleRef::Id(id),
            (None, Some(legacy)) => RoleRef::LegacyName(legacy.as_role_name()),
            (None, None) => RoleRef::Unassigned,
        }
    }
}

// ---
// Login / tokens
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "admin@pharmacy.com")]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenPayload {
    #[validate(length(min = 1, message = "O refresh token é obrigatório."))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequestPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirmPayload {
    #[validate(length(min = 1, message = "O token é obrigatório."))]
    pub token: String,
    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub new_password: String,
}

// Mesma resposta exista ou não o e-mail
#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordResetRequested {
    pub message: &'static str,
    /// Só presente com PASSWORD_RESET_EXPOSE_TOKEN ligado.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: &'static str,
    /// Validade do access token em segundos.
    pub expires_in: i64,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // Subject (ID do usuário)
    pub email: String,
    pub role: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub iat: usize,
    pub exp: usize,
}

// Resposta do /me: perfil + permissões efetivas
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    #[schema(example = "warehouse_admin")]
    pub role: Option<String>,
    pub is_super_admin: bool,
    pub permissions: Vec<String>,
}

// Dados da requisição usados na auditoria de login
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// ---
// Administração de usuários
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub assigned_warehouse_id: Option<Uuid>,
    pub assigned_shop_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
    pub assigned_warehouse_id: Option<Uuid>,
    pub assigned_shop_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Filtros do GET /users.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub role_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Busca por nome ou e-mail.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role_id: Option<Uuid>, legacy_role: Option<LegacyRole>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "x".into(),
            full_name: "Teste".into(),
            phone: None,
            legacy_role,
            role_id,
            assigned_warehouse_id: None,
            assigned_shop_id: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_id_wins_over_legacy_role() {
        let id = Uuid::new_v4();
        assert_eq!(user(Some(id), Some(LegacyRole::Cashier)).role_ref(), RoleRef::Id(id));
        assert_eq!(
            user(None, Some(LegacyRole::WarehouseAdmin)).role_ref(),
            RoleRef::LegacyName("warehouse_admin")
        );
        assert_eq!(user(None, None).role_ref(), RoleRef::Unassigned);
    }

    #[test]
    fn password_hash_never_serialized() {
        let json = serde_json::to_value(user(None, None)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@b.com");
    }
}

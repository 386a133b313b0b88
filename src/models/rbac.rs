// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// Escopo de uma permissão (sufixo do código)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permission_scope", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    Global,
    Warehouse,
    Shop,
}

impl PermissionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::Global => "global",
            PermissionScope::Warehouse => "warehouse",
            PermissionScope::Shop => "shop",
        }
    }
}

impl FromStr for PermissionScope {
    type Err = PermissionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(PermissionScope::Global),
            "warehouse" => Ok(PermissionScope::Warehouse),
            "shop" => Ok(PermissionScope::Shop),
            other => Err(PermissionCodeError::UnknownScope(other.to_string())),
        }
    }
}

// Tipo de entidade a que um cargo se aplica (None = global)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "role_entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleEntityType {
    Warehouse,
    Shop,
}

impl RoleEntityType {
    /// Um cargo de armazém não pode carregar permissões de loja (e vice-versa).
    pub fn accepts(&self, scope: PermissionScope) -> bool {
        !matches!(
            (self, scope),
            (RoleEntityType::Warehouse, PermissionScope::Shop)
                | (RoleEntityType::Shop, PermissionScope::Warehouse)
        )
    }
}

// Os 7 valores fixos do campo `role` antigo dos usuários
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "legacy_role_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
    SuperAdmin,
    WarehouseAdmin,
    ShopOwner,
    Pharmacist,
    Cashier,
    HrManager,
    Accountant,
}

impl LegacyRole {
    /// Nome do cargo usado na busca por nome.
    pub fn as_role_name(&self) -> &'static str {
        match self {
            LegacyRole::SuperAdmin => "super_admin",
            LegacyRole::WarehouseAdmin => "warehouse_admin",
            LegacyRole::ShopOwner => "shop_owner",
            LegacyRole::Pharmacist => "pharmacist",
            LegacyRole::Cashier => "cashier",
            LegacyRole::HrManager => "hr_manager",
            LegacyRole::Accountant => "accountant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionCodeError {
    #[error("código de permissão '{0}' deve seguir o formato modulo.acao[.escopo]")]
    Malformed(String),
    #[error("escopo desconhecido '{0}'")]
    UnknownScope(String),
}

// ---
// Código de permissão: `module.action[.scope]`
// ---
/// Código parseado. Sem sufixo o escopo é `global`; um `.global` explícito
/// é preservado na exibição.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionCode {
    module: String,
    action: String,
    scope: PermissionScope,
    explicit_scope: bool,
}

impl PermissionCode {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn scope(&self) -> PermissionScope {
        self.scope
    }

    pub fn matches(&self, module: &str, action: &str) -> bool {
        self.module == module && self.action == action
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for PermissionCode {
    type Err = PermissionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let (module, action, scope, explicit_scope) = match parts.as_slice() {
            [module, action] => (*module, *action, PermissionScope::Global, false),
            [module, action, scope] => (*module, *action, scope.parse()?, true),
            _ => return Err(PermissionCodeError::Malformed(s.to_string())),
        };
        if !valid_segment(module) || !valid_segment(action) {
            return Err(PermissionCodeError::Malformed(s.to_string()));
        }
        Ok(PermissionCode {
            module: module.to_string(),
            action: action.to_string(),
            scope,
            explicit_scope,
        })
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.action)?;
        if self.explicit_scope {
            write!(f, ".{}", self.scope.as_str())?;
        }
        Ok(())
    }
}

/// Par `module.action` exigido por uma operação (sem escopo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredAction {
    pub module: &'static str,
    pub action: &'static str,
}

impl RequiredAction {
    pub const fn new(module: &'static str, action: &'static str) -> Self {
        Self { module, action }
    }
}

impl fmt::Display for RequiredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.action)
    }
}

// Ações verificadas pelas rotas
pub mod actions {
    use super::RequiredAction;

    pub const ROLES_VIEW: RequiredAction = RequiredAction::new("roles", "view");
    pub const ROLES_MANAGE: RequiredAction = RequiredAction::new("roles", "manage");

    pub const USERS_VIEW: RequiredAction = RequiredAction::new("users", "view");
    pub const USERS_CREATE: RequiredAction = RequiredAction::new("users", "create");
    pub const USERS_EDIT: RequiredAction = RequiredAction::new("users", "edit");
    pub const USERS_DELETE: RequiredAction = RequiredAction::new("users", "delete");

    pub const WAREHOUSES_VIEW: RequiredAction = RequiredAction::new("warehouses", "view");
    pub const WAREHOUSES_CREATE: RequiredAction = RequiredAction::new("warehouses", "create");
    pub const WAREHOUSES_EDIT: RequiredAction = RequiredAction::new("warehouses", "edit");
    pub const WAREHOUSES_DELETE: RequiredAction = RequiredAction::new("warehouses", "delete");

    pub const SHOPS_VIEW: RequiredAction = RequiredAction::new("shops", "view");
    pub const SHOPS_CREATE: RequiredAction = RequiredAction::new("shops", "create");
    pub const SHOPS_EDIT: RequiredAction = RequiredAction::new("shops", "edit");
    pub const SHOPS_DELETE: RequiredAction = RequiredAction::new("shops", "delete");

    pub const MEDICINES_VIEW: RequiredAction = RequiredAction::new("medicines", "view");
    pub const MEDICINES_CREATE: RequiredAction = RequiredAction::new("medicines", "create");
    pub const MEDICINES_EDIT: RequiredAction = RequiredAction::new("medicines", "edit");

    pub const INVENTORY_VIEW: RequiredAction = RequiredAction::new("inventory", "view");
    pub const INVENTORY_ENTRY: RequiredAction = RequiredAction::new("inventory", "entry");
    pub const INVENTORY_ADJUST: RequiredAction = RequiredAction::new("inventory", "adjust");

    pub const DISPATCHES_VIEW: RequiredAction = RequiredAction::new("dispatches", "view");
    pub const DISPATCHES_CREATE: RequiredAction = RequiredAction::new("dispatches", "create");

    pub const ALL: &[RequiredAction] = &[
        ROLES_VIEW, ROLES_MANAGE,
        USERS_VIEW, USERS_CREATE, USERS_EDIT, USERS_DELETE,
        WAREHOUSES_VIEW, WAREHOUSES_CREATE, WAREHOUSES_EDIT, WAREHOUSES_DELETE,
        SHOPS_VIEW, SHOPS_CREATE, SHOPS_EDIT, SHOPS_DELETE,
        MEDICINES_VIEW, MEDICINES_CREATE, MEDICINES_EDIT,
        INVENTORY_VIEW, INVENTORY_ENTRY, INVENTORY_ADJUST,
        DISPATCHES_VIEW, DISPATCHES_CREATE,
    ];
}

// ---
// Linhas do banco
// ---

// O que sai do banco (Tabela Permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "inventory.adjust.warehouse")]
    pub code: String,

    #[schema(example = "inventory")]
    pub module: String,

    #[schema(example = "adjust")]
    pub action: String,

    pub scope: PermissionScope,

    #[schema(example = "Adjust warehouse inventory")]
    pub description: Option<String>,
}

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "warehouse_admin")]
    pub name: String,

    #[schema(example = "Warehouse management access")]
    pub description: Option<String>,

    pub entity_type: Option<RoleEntityType>,
    pub is_system: bool,
    pub is_creatable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Resposta completa (Cargo + Lista de Permissões)
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,

    #[schema(example = json!(["inventory.view.warehouse", "inventory.adjust.warehouse"]))]
    pub permissions: Vec<String>,

    pub user_count: i64,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRolePayload {
    #[validate(length(min = 2, max = 50, message = "O nome do cargo deve ter entre 2 e 50 caracteres."))]
    #[schema(example = "inventory_clerk")]
    pub name: String,

    pub description: Option<String>,

    pub entity_type: Option<RoleEntityType>,

    #[serde(default = "default_true")]
    pub is_creatable: bool,

    #[serde(default)]
    #[schema(example = json!(["inventory.view.warehouse", "inventory.entry.warehouse"]))]
    pub permissions: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRolePayload {
    #[validate(length(min = 2, max = 50, message = "O nome do cargo deve ter entre 2 e 50 caracteres."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_creatable: Option<bool>,
    /// Quando presente, substitui o conjunto inteiro.
    pub permissions: Option<Vec<String>>,
}

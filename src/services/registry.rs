// src/services/registry.rs

//! Registro declarativo de permissões e cargos de sistema (`seed/rbac.json`).
//!
//! Na inicialização o arquivo é validado e sincronizado: permissões e cargos
//! que faltam são inseridos. Cargos criados por operadores nunca são tocados,
//! e vínculos revogados de cargos existentes não voltam.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::{
    common::error::AppError,
    db::RbacRepository,
    models::rbac::{PermissionCode, PermissionScope, RoleEntityType},
};

const SEED: &str = include_str!("../../seed/rbac.json");

pub const SUPER_ADMIN_ROLE: &str = "super_admin";

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPermission {
    pub code: String,
    pub module: String,
    pub action: String,
    pub scope: PermissionScope,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRole {
    pub name: String,
    pub description: Option<String>,
    pub entity_type: Option<RoleEntityType>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default = "default_true")]
    pub is_creatable: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    pub permissions: Vec<SeedPermission>,
    pub roles: Vec<SeedRole>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registro de permissões mal formado: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("permissão '{code}': {reason}")]
    InvalidPermission { code: String, reason: String },
    #[error("permissão '{0}' declarada mais de uma vez")]
    DuplicatePermission(String),
    #[error("cargo '{0}' declarado mais de uma vez")]
    DuplicateRole(String),
    #[error("cargo '{role}' referencia a permissão desconhecida '{code}'")]
    UnknownGrant { role: String, code: String },
    #[error("cargo '{role}' não pode receber a permissão '{code}' pelo seu tipo")]
    ScopeMismatch { role: String, code: String },
    #[error("apenas 'super_admin' pode ser cargo de sistema (encontrado '{0}')")]
    UnexpectedSystemRole(String),
    #[error("o cargo 'super_admin' precisa existir e ser de sistema")]
    MissingSuperAdmin,
}

/// Resultado da sincronização, para o log de inicialização.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub grants_created: u64,
}

impl Registry {
    /// O registro embutido no binário.
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::parse(SEED)
    }

    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let registry: Registry = serde_json::from_str(raw)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut codes: HashSet<&str> = HashSet::new();
        let mut scopes = HashMap::new();

        for p in &self.permissions {
            let invalid = |reason: String| RegistryError::InvalidPermission {
                code: p.code.clone(),
                reason,
            };
            let parsed = p
                .code
                .parse::<PermissionCode>()
                .map_err(|e| invalid(e.to_string()))?;
            if !parsed.matches(&p.module, &p.action) {
                return Err(invalid("módulo/ação não batem com o código".into()));
            }
            if parsed.scope() != p.scope {
                return Err(invalid(format!("escopo declarado '{}' difere do código", p.scope.as_str())));
            }
            if !codes.insert(p.code.as_str()) {
                return Err(RegistryError::DuplicatePermission(p.code.clone()));
            }
            scopes.insert(p.code.as_str(), p.scope);
        }

        let mut names: HashSet<&str> = HashSet::new();
        for role in &self.roles {
            if !names.insert(role.name.as_str()) {
                return Err(RegistryError::DuplicateRole(role.name.clone()));
            }
            if role.is_system && role.name != SUPER_ADMIN_ROLE {
                return Err(RegistryError::UnexpectedSystemRole(role.name.clone()));
            }
            for code in &role.permissions {
                let scope = scopes.get(code.as_str()).ok_or_else(|| RegistryError::UnknownGrant {
                    role: role.name.clone(),
                    code: code.clone(),
                })?;
                if let Some(entity_type) = role.entity_type {
                    if !entity_type.accepts(*scope) {
                        return Err(RegistryError::ScopeMismatch {
                            role: role.name.clone(),
                            code: code.clone(),
                        });
                    }
                }
            }
        }

        if !self.roles.iter().any(|r| r.name == SUPER_ADMIN_ROLE && r.is_system) {
            return Err(RegistryError::MissingSuperAdmin);
        }
        Ok(())
    }

    /// Insere o que falta, numa única transação.
    ///
    /// Vínculos são criados para cargos novos e, em cargos que já existiam,
    /// apenas para permissões que acabaram de ser inseridas.
    pub async fn sync(&self, pool: &PgPool, repo: &RbacRepository) -> Result<SyncReport, AppError> {
        let mut tx = pool.begin().await?;
        let mut report = SyncReport::default();

        let mut new_codes: HashSet<String> = HashSet::new();
        for p in &self.permissions {
            let inserted = repo
                .insert_permission_if_missing(
                    &mut *tx,
                    &p.code,
                    &p.module,
                    &p.action,
                    p.scope,
                    p.description.as_deref(),
                )
                .await?;
            if let Some(code) = inserted {
                new_codes.insert(code);
            }
        }
        report.permissions_created = new_codes.len();

        for seed in &self.roles {
            let created = repo
                .insert_role_if_missing(
                    &mut *tx,
                    &seed.name,
                    seed.description.as_deref(),
                    seed.entity_type,
                    seed.is_system,
                    seed.is_creatable,
                )
                .await?;

            let (role_id, grants): (_, Vec<String>) = match created {
                Some(role) => {
                    report.roles_created += 1;
                    (role.id, seed.permissions.clone())
                }
                None => {
                    let Some(existing) = repo.find_role_by_name(&mut *tx, &seed.name).await? else {
                        continue;
                    };
                    let fresh = seed
                        .permissions
                        .iter()
                        .filter(|c| new_codes.contains(*c))
                        .cloned()
                        .collect();
                    (existing.id, fresh)
                }
            };

            if !grants.is_empty() {
                report.grants_created += repo.assign_permission_codes(&mut *tx, role_id, &grants).await?;
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}

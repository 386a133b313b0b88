// src/services/rbac_service.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RbacRepository,
    models::{
        auth::{RoleRef, User},
        rbac::{
            CreateRolePayload, Permission, PermissionCode, Role, RoleEntityType, RoleResponse,
            UpdateRolePayload,
        },
    },
    services::access::EffectivePermissions,
};

/// Leitura de cargos e permissões usada na resolução.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError>;
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, AppError>;
    async fn role_codes(&self, role_id: Uuid) -> Result<Vec<String>, AppError>;
    async fn all_codes(&self) -> Result<Vec<String>, AppError>;
}

#[async_trait]
impl PermissionSource for RbacRepository {
    async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        self.find_role_by_id(self.pool(), id).await
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        self.find_role_by_name(self.pool(), name).await
    }

    async fn role_codes(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        self.role_permission_codes(self.pool(), role_id).await
    }

    async fn all_codes(&self) -> Result<Vec<String>, AppError> {
        self.all_permission_codes().await
    }
}

/// Resolve o cargo do usuário e o conjunto efetivo de permissões.
///
/// Sem cargo resolvível o conjunto é vazio (não é erro). Cargo de sistema
/// recebe todos os códigos do registro.
pub async fn resolve_permissions<S>(
    source: &S,
    user: &User,
) -> Result<(Option<Role>, EffectivePermissions), AppError>
where
    S: PermissionSource + ?Sized,
{
    let role = match user.role_ref() {
        RoleRef::Id(id) => source.role_by_id(id).await?,
        RoleRef::LegacyName(name) => source.role_by_name(name).await?,
        RoleRef::Unassigned => None,
    };

    let permissions = match &role {
        Some(role) if role.is_system => EffectivePermissions::super_admin(source.all_codes().await?),
        Some(role) => EffectivePermissions::from_codes(source.role_codes(role.id).await?),
        None => EffectivePermissions::empty(),
    };

    Ok((role, permissions))
}

/// Valida os códigos pedidos para um cargo contra o registro e o tipo de entidade.
fn check_role_codes(
    codes: &[String],
    known: &[Permission],
    entity_type: Option<RoleEntityType>,
) -> Result<(), AppError> {
    let known_codes: HashSet<&str> = known.iter().map(|p| p.code.as_str()).collect();

    let unknown: Vec<&str> = codes
        .iter()
        .map(String::as_str)
        .filter(|c| !known_codes.contains(c))
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "Permissões desconhecidas: {}",
            unknown.join(", ")
        )));
    }

    if let Some(entity_type) = entity_type {
        for code in codes {
            let parsed = code
                .parse::<PermissionCode>()
                .map_err(|e| AppError::InvalidInput(e.to_string()))?;
            if !entity_type.accepts(parsed.scope()) {
                return Err(AppError::InvalidInput(format!(
                    "A permissão '{}' não combina com o tipo do cargo.",
                    code
                )));
            }
        }
    }
    Ok(())
}

fn dedup(codes: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn resolve(&self, user: &User) -> Result<(Option<Role>, EffectivePermissions), AppError> {
        resolve_permissions(&self.repo, user).await
    }

    pub async fn list_system_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_all_permissions().await
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleResponse>, AppError> {
        let roles = self.repo.list_roles().await?;

        let mut grants: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (role_id, code) in self.repo.list_role_grants().await? {
            grants.entry(role_id).or_default().push(code);
        }
        let counts: HashMap<Uuid, i64> = self.repo.user_counts_by_role().await?.into_iter().collect();

        Ok(roles
            .into_iter()
            .map(|role| RoleResponse {
                permissions: grants.remove(&role.id).unwrap_or_default(),
                user_count: counts.get(&role.id).copied().unwrap_or(0),
                role,
            })
            .collect())
    }

    pub async fn get_role(&self, id: Uuid) -> Result<RoleResponse, AppError> {
        let role = self
            .repo
            .find_role_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Cargo"))?;
        self.role_response(role).await
    }

    async fn role_response(&self, role: Role) -> Result<RoleResponse, AppError> {
        let permissions = self.repo.role_permission_codes(&self.pool, role.id).await?;
        let user_count = self.repo.count_role_users(&self.pool, &role).await?;
        Ok(RoleResponse {
            role,
            permissions,
            user_count,
        })
    }

    pub async fn create_role(&self, payload: CreateRolePayload) -> Result<RoleResponse, AppError> {
        let codes = dedup(payload.permissions);

        // 1. Inicia Transação
        let mut tx = self.pool.begin().await?;

        // 2. Resolve os códigos para IDs e valida
        let permissions = self.repo.find_permissions_by_codes(&mut *tx, &codes).await?;
        check_role_codes(&codes, &permissions, payload.entity_type)?;

        // 3. Cria o Cargo
        let role = self
            .repo
            .create_role(
                &mut *tx,
                payload.name.trim(),
                payload.description.as_deref(),
                payload.entity_type,
                payload.is_creatable,
            )
            .await?;

        // 4. Salva o Vínculo
        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        if !permission_ids.is_empty() {
            self.repo.assign_permissions(&mut *tx, role.id, &permission_ids).await?;
        }

        // 5. Commit
        tx.commit().await?;

        tracing::info!(role = %role.name, permissions = permission_ids.len(), "Cargo criado");

        let mut permissions: Vec<String> = permissions.into_iter().map(|p| p.code).collect();
        permissions.sort();
        Ok(RoleResponse {
            role,
            permissions,
            user_count: 0,
        })
    }

    pub async fn update_role(&self, id: Uuid, payload: UpdateRolePayload) -> Result<RoleResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .repo
            .find_role_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cargo"))?;
        if current.is_system {
            return Err(AppError::SystemRoleImmutable);
        }

        let role = self
            .repo
            .update_role(
                &mut *tx,
                id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                payload.is_creatable,
            )
            .await?;

        // Lista de permissões presente = substituição completa
        if let Some(codes) = payload.permissions {
            let codes = dedup(codes);
            let permissions = self.repo.find_permissions_by_codes(&mut *tx, &codes).await?;
            check_role_codes(&codes, &permissions, role.entity_type)?;

            self.repo.clear_permissions(&mut *tx, id).await?;
            let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
            if !permission_ids.is_empty() {
                self.repo.assign_permissions(&mut *tx, id, &permission_ids).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(role = %role.name, "Cargo atualizado");

        self.role_response(role).await
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let role = self
            .repo
            .find_role_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cargo"))?;
        if role.is_system {
            return Err(AppError::SystemRoleImmutable);
        }

        let users = self.repo.count_role_users(&mut *tx, &role).await?;
        if users > 0 {
            return Err(AppError::Conflict(format!(
                "O cargo '{}' está atribuído a {} usuário(s).",
                role.name, users
            )));
        }

        self.repo.delete_role(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(role = %role.name, "Cargo removido");
        Ok(())
    }

    pub async fn grant_permission(&self, role_id: Uuid, code: &str) -> Result<RoleResponse, AppError> {
        let (role, permission) = self.role_and_permission(role_id, code).await?;
        if let Some(entity_type) = role.entity_type {
            if !entity_type.accepts(permission.scope) {
                return Err(AppError::InvalidInput(format!(
                    "A permissão '{}' não combina com o tipo do cargo.",
                    code
                )));
            }
        }

        self.repo.grant_permission(&self.pool, role.id, permission.id).await?;
        tracing::info!(role = %role.name, permission = %code, "Permissão concedida");

        self.role_response(role).await
    }

    pub async fn revoke_permission(&self, role_id: Uuid, code: &str) -> Result<RoleResponse, AppError> {
        let (role, permission) = self.role_and_permission(role_id, code).await?;

        let removed = self.repo.revoke_permission(&self.pool, role.id, permission.id).await?;
        if removed == 0 {
            return Err(AppError::NotFound("Vínculo entre cargo e permissão"));
        }
        tracing::info!(role = %role.name, permission = %code, "Permissão revogada");

        self.role_response(role).await
    }

    async fn role_and_permission(&self, role_id: Uuid, code: &str) -> Result<(Role, Permission), AppError> {
        let role = self
            .repo
            .find_role_by_id(&self.pool, role_id)
            .await?
            .ok_or(AppError::NotFound("Cargo"))?;
        if role.is_system {
            return Err(AppError::SystemRoleImmutable);
        }

        let permission = self
            .repo
            .find_permissions_by_codes(&self.pool, &[code.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound("Permissão"))?;

        Ok((role, permission))
    }

    /// Preenche `role_id` a partir do enum antigo, onde houver cargo com o mesmo nome.
    pub async fn backfill_legacy_roles(&self) -> Result<u64, AppError> {
        let updated = self.repo.backfill_legacy_roles(&self.pool).await?;
        if updated > 0 {
            tracing::info!("{} usuário(s) migrados do cargo antigo para role_id", updated);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::{LegacyRole, PermissionScope};
    use chrono::Utc;

    // Fonte em memória
    #[derive(Default)]
    struct FakeSource {
        roles: Vec<Role>,
        grants: HashMap<Uuid, Vec<String>>,
        registry: Vec<String>,
    }

    #[async_trait]
    impl PermissionSource for FakeSource {
        async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
            Ok(self.roles.iter().find(|r| r.id == id).cloned())
        }
        async fn role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
            Ok(self.roles.iter().find(|r| r.name == name).cloned())
        }
        async fn role_codes(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
            Ok(self.grants.get(&role_id).cloned().unwrap_or_default())
        }
        async fn all_codes(&self) -> Result<Vec<String>, AppError> {
            Ok(self.registry.clone())
        }
    }

    fn role(name: &str, is_system: bool) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            entity_type: None,
            is_system,
            is_creatable: !is_system,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(role_id: Option<Uuid>, legacy_role: Option<LegacyRole>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "u@pharmacy.com".into(),
            password_hash: String::new(),
            full_name: "Usuário".into(),
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

    fn source() -> (FakeSource, Role, Role) {
        let admin = role("super_admin", true);
        let wh = role("warehouse_admin", false);
        let mut grants = HashMap::new();
        grants.insert(wh.id, vec!["inventory.view.warehouse".to_string()]);
        let src = FakeSource {
            roles: vec![admin.clone(), wh.clone()],
            grants,
            registry: vec![
                "inventory.view.warehouse".into(),
                "roles.manage".into(),
                "users.view".into(),
            ],
        };
        (src, admin, wh)
    }

    #[tokio::test]
    async fn system_role_gets_every_registry_code() {
        let (src, admin, _) = source();
        let (resolved, perms) = resolve_permissions(&src, &user(Some(admin.id), None)).await.unwrap();
        assert_eq!(resolved.map(|r| r.name), Some("super_admin".into()));
        assert!(perms.is_super_admin());
        assert_eq!(perms.codes(), vec!["inventory.view.warehouse", "roles.manage", "users.view"]);
    }

    #[tokio::test]
    async fn legacy_enum_resolves_by_role_name() {
        let (src, _, wh) = source();
        let (resolved, perms) = resolve_permissions(&src, &user(None, Some(LegacyRole::WarehouseAdmin)))
            .await
            .unwrap();
        assert_eq!(resolved.map(|r| r.id), Some(wh.id));
        assert!(!perms.is_super_admin());
        assert!(perms.contains("inventory.view.warehouse"));
    }

    #[tokio::test]
    async fn unresolvable_role_gives_empty_set() {
        let (src, _, _) = source();

        let (role, perms) = resolve_permissions(&src, &user(None, None)).await.unwrap();
        assert!(role.is_none());
        assert!(perms.is_empty());

        // Nome antigo sem cargo correspondente
        let (role, perms) = resolve_permissions(&src, &user(None, Some(LegacyRole::Cashier)))
            .await
            .unwrap();
        assert!(role.is_none());
        assert!(perms.is_empty());

        let (_, perms) = resolve_permissions(&src, &user(Some(Uuid::new_v4()), None)).await.unwrap();
        assert!(perms.is_empty());
    }

    fn permission(code: &str, scope: PermissionScope) -> Permission {
        let parsed: PermissionCode = code.parse().unwrap();
        Permission {
            id: Uuid::new_v4(),
            code: code.to_string(),
            module: parsed.module().to_string(),
            action: parsed.action().to_string(),
            scope,
            description: None,
        }
    }

    #[test]
    fn role_codes_must_exist_and_match_entity_type() {
        let known = vec![
            permission("inventory.view.warehouse", PermissionScope::Warehouse),
            permission("billing.create.shop", PermissionScope::Shop),
            permission("dashboard.view", PermissionScope::Global),
        ];

        let ok = vec!["inventory.view.warehouse".to_string(), "dashboard.view".to_string()];
        assert!(check_role_codes(&ok, &known, Some(RoleEntityType::Warehouse)).is_ok());

        let unknown = vec!["inventory.teleport".to_string()];
        assert!(matches!(
            check_role_codes(&unknown, &known, None),
            Err(AppError::InvalidInput(_))
        ));

        let mixed = vec!["billing.create.shop".to_string()];
        assert!(check_role_codes(&mixed, &known, Some(RoleEntityType::Warehouse)).is_err());
        assert!(check_role_codes(&mixed, &known, None).is_ok());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let codes = dedup(vec!["a.b".into(), " a.b ".into(), "c.d".into()]);
        assert_eq!(codes, vec!["a.b", "c.d"]);
    }
}

// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::{Permission, PermissionScope, Role, RoleEntityType};

const ROLE_COLUMNS: &str =
    "id, name, description, entity_type, is_system, is_creatable, created_at, updated_at";

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Permissões
    // ---

    // Listar todas as permissões (para o Frontend montar a tela)
    pub async fn list_all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, code, module, action, scope, description FROM permissions ORDER BY module, code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    pub async fn all_permission_codes(&self) -> Result<Vec<String>, AppError> {
        let codes = sqlx::query_scalar::<_, String>("SELECT code FROM permissions ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    // Busca as permissões pelos códigos ("inventory.view.warehouse" -> UUID)
    pub async fn find_permissions_by_codes<'e, E>(
        &self,
        executor: E,
        codes: &[String],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O SQLx lida bem com arrays usando ANY
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, code, module, action, scope, description
            FROM permissions
            WHERE code = ANY($1)
            "#,
        )
        .bind(codes)
        .fetch_all(executor)
        .await?;

        Ok(permissions)
    }

    /// Insere a permissão se o código ainda não existe. Retorna o código quando inseriu.
    pub async fn insert_permission_if_missing<'e, E>(
        &self,
        executor: E,
        code: &str,
        module: &str,
        action: &str,
        scope: PermissionScope,
        description: Option<&str>,
    ) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inserted = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO permissions (code, module, action, scope, description)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            RETURNING code
            "#,
        )
        .bind(code)
        .bind(module)
        .bind(action)
        .bind(scope)
        .bind(description)
        .fetch_optional(executor)
        .await?;

        Ok(inserted)
    }

    // ---
    // Cargos
    // ---

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY is_system DESC, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    pub async fn find_role_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(role)
    }

    pub async fn find_role_by_name<'e, E>(&self, executor: E, name: &str) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_optional(executor)
            .await?;
        Ok(role)
    }

    pub async fn role_permission_codes<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.code
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.code
            "#,
        )
        .bind(role_id)
        .fetch_all(executor)
        .await?;
        Ok(codes)
    }

    /// Todos os pares (cargo, código) de uma vez, para a listagem.
    pub async fn list_role_grants(&self) -> Result<Vec<(Uuid, String)>, AppError> {
        let grants = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT rp.role_id, p.code
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            ORDER BY p.code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(grants)
    }

    /// Usuários que apontam para o cargo, via `role_id` ou pelo enum antigo.
    pub async fn count_role_users<'e, E>(&self, executor: E, role: &Role) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE role_id = $1
               OR (role_id IS NULL AND legacy_role::text = $2)
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn user_counts_by_role(&self) -> Result<Vec<(Uuid, i64)>, AppError> {
        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT r.id, COUNT(u.id)
            FROM roles r
            LEFT JOIN users u
                   ON u.role_id = r.id
                   OR (u.role_id IS NULL AND u.legacy_role::text = r.name)
            GROUP BY r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    // Criar o Cargo
    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        entity_type: Option<RoleEntityType>,
        is_creatable: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, description, entity_type, is_system, is_creatable)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(description)
        .bind(entity_type)
        .bind(is_creatable)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um cargo com esse nome."))?;

        Ok(role)
    }

    /// Usado pela sincronização do registro. `None` quando o nome já existe.
    pub async fn insert_role_if_missing<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        entity_type: Option<RoleEntityType>,
        is_system: bool,
        is_creatable: bool,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, description, entity_type, is_system, is_creatable)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(description)
        .bind(entity_type)
        .bind(is_system)
        .bind(is_creatable)
        .fetch_optional(executor)
        .await?;
        Ok(role)
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        is_creatable: Option<bool>,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_creatable = COALESCE($4, is_creatable),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(is_creatable)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um cargo com esse nome."))?
        .ok_or(AppError::NotFound("Cargo"))?;
        Ok(role)
    }

    pub async fn delete_role<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| AppError::from_foreign_key_violation(e, "O cargo ainda está em uso."))?;
        Ok(result.rows_affected())
    }

    // ---
    // Vínculo Cargo <-> Permissão
    // ---

    pub async fn assign_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Inserção em massa usando UNNEST para performance
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Vincula por código; códigos desconhecidos são ignorados pelo JOIN.
    pub async fn assign_permission_codes<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        codes: &[String],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.code = ANY($2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(codes)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_permissions<'e, E>(&self, executor: E, role_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Inserção simples: par repetido vira 409
    pub async fn grant_permission<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(executor)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "O cargo já possui essa permissão."))?;
        Ok(())
    }

    pub async fn revoke_permission<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Migração do enum antigo para role_id
    // ---
    pub async fn backfill_legacy_roles<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users u
            SET role_id = r.id, updated_at = NOW()
            FROM roles r
            WHERE u.role_id IS NULL
              AND u.legacy_role IS NOT NULL
              AND r.name = u.legacy_role::text
            "#,
        )
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageParams},
    models::{
        auth::{UpdateUserPayload, User, UserFilter},
        rbac::LegacyRole,
    },
    services::access::LocationFilter,
};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone, legacy_role, role_id, \
     assigned_warehouse_id, assigned_shop_id, is_active, last_login, created_at, updated_at";

// Filtro comum a listagem e contagem
const LIST_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR role_id = $1)
      AND ($2::uuid IS NULL OR assigned_warehouse_id = $2)
      AND ($3::uuid IS NULL OR assigned_shop_id = $3)
      AND ($4::boolean IS NULL OR is_active = $4)
      AND ($5::text IS NULL OR full_name ILIKE '%' || $5 || '%' OR email ILIKE '%' || $5 || '%')
"#;

/// Dados de um novo usuário (senha já com hash).
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub phone: Option<&'a str>,
    pub legacy_role: Option<LegacyRole>,
    pub role_id: Uuid,
    pub assigned_warehouse_id: Option<Uuid>,
    pub assigned_shop_id: Option<Uuid>,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    pub async fn list(
        &self,
        filter: &UserFilter,
        location: LocationFilter,
        page: &PageParams,
    ) -> Result<(Vec<User>, i64), AppError> {
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {LIST_WHERE} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.role_id)
        .bind(location.warehouse_id)
        .bind(location.shop_id)
        .bind(filter.is_active)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {LIST_WHERE}"))
            .bind(filter.role_id)
            .bind(location.warehouse_id)
            .bind(location.shop_id)
            .bind(filter.is_active)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    // Cria um novo usuário no banco de dados
    // Com tratamento de erro específico para e-mails duplicados.
    pub async fn create_user<'e, E>(&self, executor: E, new_user: NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                email, password_hash, full_name, phone, legacy_role, role_id,
                assigned_warehouse_id, assigned_shop_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.full_name)
        .bind(new_user.phone)
        .bind(new_user.legacy_role)
        .bind(new_user.role_id)
        .bind(new_user.assigned_warehouse_id)
        .bind(new_user.assigned_shop_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um usuário com esse e-mail."))?;

        Ok(user)
    }

    // Local gravado como veio: o serviço já resolveu loja e armazém
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &UpdateUserPayload,
        assigned_warehouse_id: Option<Uuid>,
        assigned_shop_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                role_id = COALESCE($4, role_id),
                assigned_warehouse_id = $5,
                assigned_shop_id = $6,
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.full_name.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.role_id)
        .bind(assigned_warehouse_id)
        .bind(assigned_shop_id)
        .bind(changes.is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Usuário"))?;
        Ok(user)
    }

    pub async fn touch_last_login<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_password_hash<'e, E>(&self, executor: E, id: Uuid, password_hash: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Exclusão lógica
    pub async fn deactivate<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

// src/db/session_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::ClientInfo};

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Eventos gravados em `login_audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    Success,
    Failed,
    Logout,
    PasswordReset,
}

impl LoginEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginEvent::Success => "login_success",
            LoginEvent::Failed => "login_failed",
            LoginEvent::Logout => "logout",
            LoginEvent::PasswordReset => "password_reset",
        }
    }
}

// Sessões (refresh tokens) e trilha de auditoria de login
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_session<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        client: &ClientInfo,
    ) -> Result<Session, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, refresh_token, device_info, ip_address, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, refresh_token, expires_at
            "#,
        )
        .bind(user_id)
        .bind(refresh_token)
        .bind(client.user_agent.as_deref())
        .bind(client.ip_address.as_deref())
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(session)
    }

    /// Consome o refresh token: apaga a sessão válida e devolve o dono.
    ///
    /// Duas trocas simultâneas do mesmo token disputam a mesma linha; só uma
    /// recebe `Some`.
    pub async fn consume_refresh_token<'e, E>(&self, executor: E, refresh_token: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM sessions
            WHERE refresh_token = $1 AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(executor)
        .await?;
        Ok(user_id)
    }

    pub async fn count_user_sessions(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_user_sessions<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Redefinição de senha
    // ---

    pub async fn create_reset_token<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Marca o token como usado e devolve o dono. `None` se usado, vencido ou inexistente.
    pub async fn consume_reset_token<'e, E>(&self, executor: E, token: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE password_reset_tokens SET used = TRUE
            WHERE token = $1 AND NOT used AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(user_id)
    }

    pub async fn record_login_event<'e, E>(
        &self,
        executor: E,
        event: LoginEvent,
        email: &str,
        user_id: Option<Uuid>,
        client: &ClientInfo,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO login_audit_logs (user_id, email, action, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(event.as_str())
        .bind(client.ip_address.as_deref())
        .bind(client.user_agent.as_deref())
        .execute(executor)
        .await?;
        Ok(())
    }
}

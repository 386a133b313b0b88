// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{
        session_repo::LoginEvent, user_repo::NewUser, RbacRepository, SessionRepository,
        UserRepository,
    },
    models::{
        auth::{Claims, ClientInfo, RoleRef, TokenResponse, User},
        rbac::{LegacyRole, Role},
    },
    services::{rbac_service::PermissionSource, registry::SUPER_ADMIN_ROLE},
};

const REFRESH_TOKEN_LEN: usize = 64;
const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Validade dos tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

// Token opaco (refresh e redefinição de senha)
fn generate_refresh_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    // Hashing em um thread separado
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    rbac_repo: RbacRepository,
    jwt_secret: String,
    lifetimes: TokenLifetimes,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        rbac_repo: RbacRepository,
        jwt_secret: String,
        lifetimes: TokenLifetimes,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            rbac_repo,
            jwt_secret,
            lifetimes,
            pool,
        }
    }

    pub async fn login_user(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<TokenResponse, AppError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            self.session_repo
                .record_login_event(&self.pool, LoginEvent::Failed, email, None, client)
                .await?;
            return Err(AppError::InvalidCredentials);
        };

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            self.session_repo
                .record_login_event(&self.pool, LoginEvent::Failed, &user.email, Some(user.id), client)
                .await?;
            tracing::warn!(user_id = %user.id, "Senha inválida");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            self.session_repo
                .record_login_event(&self.pool, LoginEvent::Failed, &user.email, Some(user.id), client)
                .await?;
            return Err(AppError::AccountDisabled);
        }

        let role = self.resolve_role(&user).await?;
        let access_token = self.create_token(&user, role.as_ref())?;
        let refresh_token = generate_refresh_token();

        // Sessão + auditoria + last_login juntos
        let mut tx = self.pool.begin().await?;
        self.user_repo.touch_last_login(&mut *tx, user.id).await?;
        self.session_repo
            .create_session(
                &mut *tx,
                user.id,
                &refresh_token,
                Utc::now() + self.lifetimes.refresh,
                client,
            )
            .await?;
        self.session_repo
            .record_login_event(&mut *tx, LoginEvent::Success, &user.email, Some(user.id), client)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Login realizado");
        Ok(self.token_response(access_token, refresh_token))
    }

    /// Troca um refresh token válido por um novo par (o antigo é descartado).
    pub async fn refresh(&self, refresh_token: &str, client: &ClientInfo) -> Result<TokenResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let user_id = self
            .session_repo
            .consume_refresh_token(&mut *tx, refresh_token)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        let role = self.resolve_role(&user).await?;
        let access_token = self.create_token(&user, role.as_ref())?;
        let new_refresh = generate_refresh_token();

        self.session_repo
            .create_session(&mut *tx, user.id, &new_refresh, Utc::now() + self.lifetimes.refresh, client)
            .await?;
        tx.commit().await?;

        Ok(self.token_response(access_token, new_refresh))
    }

    pub async fn logout(&self, user: &User, client: &ClientInfo) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let removed = self.session_repo.delete_user_sessions(&mut *tx, user.id).await?;
        self.session_repo
            .record_login_event(&mut *tx, LoginEvent::Logout, &user.email, Some(user.id), client)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, sessions = removed, "Logout realizado");
        Ok(())
    }

    /// Gera um token de redefinição de uso único, válido por 1 hora.
    ///
    /// E-mail desconhecido ou conta inativa devolve `None`; o handler responde
    /// igual nos dois casos.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AppError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let token = generate_refresh_token();
        self.session_repo
            .create_reset_token(&self.pool, user.id, &token, Utc::now() + RESET_TOKEN_TTL)
            .await?;

        tracing::info!(user_id = %user.id, "Redefinição de senha solicitada");
        Ok(Some(token))
    }

    /// Troca a senha e derruba todas as sessões do usuário.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        let password_hash = hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;
        let user_id = self
            .session_repo
            .consume_reset_token(&mut *tx, token)
            .await?
            .ok_or_else(|| AppError::InvalidInput("Token inválido ou expirado.".to_string()))?;
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;

        self.user_repo.set_password_hash(&mut *tx, user.id, &password_hash).await?;
        let removed = self.session_repo.delete_user_sessions(&mut *tx, user.id).await?;
        self.session_repo
            .record_login_event(&mut *tx, LoginEvent::PasswordReset, &user.email, Some(user.id), client)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, sessions = removed, "Senha redefinida");
        Ok(())
    }

    /// Decodifica o access token. O usuário é carregado pelo middleware.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub fn create_token(&self, user: &User, role: Option<&Role>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.lifetimes.access;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: role.map(|r| r.name.clone()),
            warehouse_id: user.assigned_warehouse_id,
            shop_id: user.assigned_shop_id,
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        // Usa '?' para um tratamento de erro mais limpo
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    fn token_response(&self, access_token: String, refresh_token: String) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.lifetimes.access.num_seconds(),
        }
    }

    async fn resolve_role(&self, user: &User) -> Result<Option<Role>, AppError> {
        Ok(match user.role_ref() {
            RoleRef::Id(id) => self.rbac_repo.role_by_id(id).await?,
            RoleRef::LegacyName(name) => self.rbac_repo.role_by_name(name).await?,
            RoleRef::Unassigned => None,
        })
    }

    /// Cria o primeiro super-admin quando o e-mail ainda não existe.
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<bool, AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let role = self
            .rbac_repo
            .role_by_name(SUPER_ADMIN_ROLE)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Cargo '{}' não encontrado", SUPER_ADMIN_ROLE))?;

        let password_hash = hash_password(password).await?;
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                NewUser {
                    email,
                    password_hash: &password_hash,
                    full_name,
                    phone: None,
                    legacy_role: Some(LegacyRole::SuperAdmin),
                    role_id: role.id,
                    assigned_warehouse_id: None,
                    assigned_shop_id: None,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "Super-admin inicial criado");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            SessionRepository::new(pool.clone()),
            RbacRepository::new(pool.clone()),
            "segredo-de-teste".into(),
            TokenLifetimes {
                access: Duration::minutes(30),
                refresh: Duration::days(7),
            },
            pool,
        )
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "wh@pharmacy.com".into(),
            password_hash: String::new(),
            full_name: "Admin do Armazém".into(),
            phone: None,
            legacy_role: None,
            role_id: None,
            assigned_warehouse_id: Some(Uuid::new_v4()),
            assigned_shop_id: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn token_carries_identity_and_assignment() {
        let service = service();
        let user = user();
        let token = service.create_token(&user, None).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.warehouse_id, user.assigned_warehouse_id);
        assert_eq!(claims.shop_id, None);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let service = service();
        let mut token = service.create_token(&user(), None).unwrap();
        token.push('x');
        assert!(matches!(service.validate_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service.validate_token("lixo"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn refresh_tokens_are_random_and_long() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), REFRESH_TOKEN_LEN);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

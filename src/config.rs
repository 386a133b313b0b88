// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        DispatchRepository, InventoryRepository, MedicineRepository, OrganizationRepository, RbacRepository,
        SessionRepository, UserRepository,
    },
    services::{
        auth::TokenLifetimes, AuthService, DispatchService, InventoryService, MedicineService,
        OrganizationService, RbacService, UserService,
    },
};

/// Credenciais do primeiro super-admin (opcional).
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Devolve o token de redefinição na resposta (sem serviço de e-mail).
    pub password_reset_expose_token: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

// Lê uma variável numérica, com valor padrão
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bootstrap_admin = match (env::var("BOOTSTRAP_ADMIN_EMAIL"), env::var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => Some(BootstrapAdmin {
                email: email.trim().to_owned(),
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            access_token_ttl_minutes: parse_var("ACCESS_TOKEN_TTL_MINUTES", 30)?,
            refresh_token_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS", 7)?,
            password_reset_expose_token: parse_var("PASSWORD_RESET_EXPOSE_TOKEN", false)?,
            bootstrap_admin,
        })
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: chrono::Duration::minutes(self.access_token_ttl_minutes),
            refresh: chrono::Duration::days(self.refresh_token_ttl_days),
        }
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub user_repo: UserRepository,
    pub auth_service: AuthService,
    pub rbac_service: RbacService,
    pub user_service: UserService,
    pub organization_service: OrganizationService,
    pub medicine_service: MedicineService,
    pub inventory_service: InventoryService,
    pub dispatch_service: DispatchService,
}

impl AppState {
    /// Monta o grafo de dependências sobre um pool já criado.
    pub fn from_parts(config: Config, db_pool: PgPool) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let org_repo = OrganizationRepository::new(db_pool.clone());
        let medicine_repo = MedicineRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let dispatch_repo = DispatchRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            session_repo.clone(),
            rbac_repo.clone(),
            config.jwt_secret.clone(),
            config.token_lifetimes(),
            db_pool.clone(),
        );
        let rbac_service = RbacService::new(rbac_repo.clone(), db_pool.clone());
        let user_service = UserService::new(
            user_repo.clone(),
            rbac_repo,
            org_repo.clone(),
            session_repo,
            db_pool.clone(),
        );
        let organization_service = OrganizationService::new(org_repo.clone(), db_pool.clone());
        let medicine_service = MedicineService::new(medicine_repo.clone(), db_pool.clone());
        let inventory_service = InventoryService::new(
            inventory_repo.clone(),
            medicine_repo.clone(),
            org_repo.clone(),
            db_pool.clone(),
        );
        let dispatch_service = DispatchService::new(dispatch_repo, inventory_repo, medicine_repo, org_repo, db_pool.clone());

        Self {
            db_pool,
            config: Arc::new(config),
            user_repo,
            auth_service,
            rbac_service,
            user_service,
            organization_service,
            medicine_service,
            inventory_service,
            dispatch_service,
        }
    }
}

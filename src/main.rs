//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use pharma_backend::{
    build_router,
    config::{AppState, Config},
    db::RbacRepository,
    services::registry::Registry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let db_pool = config.connect().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::from_parts(config, db_pool);

    // Permissões e cargos de sistema declarados em seed/rbac.json
    let registry = Registry::embedded().context("Registro de permissões inválido")?;
    let report = registry
        .sync(&app_state.db_pool, &RbacRepository::new(app_state.db_pool.clone()))
        .await
        .context("Falha ao sincronizar o registro de permissões")?;
    tracing::info!(
        permissions = report.permissions_created,
        roles = report.roles_created,
        grants = report.grants_created,
        "✅ Registro de permissões sincronizado"
    );

    // Usuários antigos ganham role_id uma única vez
    app_state
        .rbac_service
        .backfill_legacy_roles()
        .await
        .context("Falha ao migrar cargos antigos")?;

    if let Some(admin) = app_state.config.bootstrap_admin.clone() {
        let created = app_state
            .auth_service
            .ensure_bootstrap_admin(&admin.email, &admin.password, "Super Admin")
            .await
            .context("Falha ao criar o super-admin inicial")?;
        if !created {
            tracing::debug!(email = %admin.email, "Super-admin inicial já existe");
        }
    }

    let addr = app_state.config.bind_addr.clone();
    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Erro no servidor Axum")?;

    Ok(())
}

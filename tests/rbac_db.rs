//! Testes contra um Postgres real (`DATABASE_URL`).
//!
//! Rodar com `cargo test -- --ignored`; cada teste recebe um banco novo
//! com as migrações aplicadas.

use sqlx::PgPool;
use uuid::Uuid;

use pharma_backend::{
    common::error::AppError,
    db::{user_repo::NewUser, RbacRepository, UserRepository},
    models::rbac::{actions, CreateRolePayload, RoleEntityType, UpdateRolePayload},
    services::{
        access::{Caller, ResourceOwner},
        registry::{Registry, SyncReport},
        RbacService,
    },
};

async fn synced(pool: &PgPool) -> RbacRepository {
    let repo = RbacRepository::new(pool.clone());
    Registry::embedded().unwrap().sync(pool, &repo).await.unwrap();
    repo
}

async fn warehouse(pool: &PgPool, code: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO warehouses (name, code, address, city, state, pincode)
         VALUES ($1, $1, 'Rua Central, 100', 'Pune', 'MH', '411001') RETURNING id",
    )
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn user_with_role(pool: &PgPool, email: &str, role_name: &str, warehouse_id: Option<Uuid>) -> Caller {
    let repo = RbacRepository::new(pool.clone());
    let role = repo.find_role_by_name(pool, role_name).await.unwrap().unwrap();
    let user = UserRepository::new(pool.clone())
        .create_user(
            pool,
            NewUser {
                email,
                password_hash: "hash",
                full_name: "Teste",
                phone: None,
                legacy_role: None,
                role_id: role.id,
                assigned_warehouse_id: warehouse_id,
                assigned_shop_id: None,
            },
        )
        .await
        .unwrap();

    let (role, permissions) = RbacService::new(repo, pool.clone()).resolve(&user).await.unwrap();
    Caller {
        user,
        role,
        permissions,
    }
}

fn role_payload(name: &str, permissions: &[&str]) -> CreateRolePayload {
    CreateRolePayload {
        name: name.into(),
        description: None,
        entity_type: None,
        is_creatable: true,
        permissions: permissions.iter().map(|c| c.to_string()).collect(),
    }
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn registry_sync_is_idempotent(pool: PgPool) {
    let repo = synced(&pool).await;
    let again = Registry::embedded().unwrap().sync(&pool, &repo).await.unwrap();
    assert_eq!(again, SyncReport::default());
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn revoked_grants_stay_revoked_after_sync(pool: PgPool) {
    let repo = synced(&pool).await;
    let service = RbacService::new(repo.clone(), pool.clone());
    let role = repo.find_role_by_name(&pool, "warehouse_admin").await.unwrap().unwrap();

    service
        .revoke_permission(role.id, "inventory.adjust.warehouse")
        .await
        .unwrap();
    Registry::embedded().unwrap().sync(&pool, &repo).await.unwrap();

    let codes = repo.role_permission_codes(&pool, role.id).await.unwrap();
    assert!(!codes.iter().any(|c| c == "inventory.adjust.warehouse"));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn super_admin_gets_every_registry_code(pool: PgPool) {
    let repo = synced(&pool).await;
    let caller = user_with_role(&pool, "root@pharmacy.com", "super_admin", None).await;

    assert!(caller.is_super_admin());
    assert_eq!(
        caller.permissions.codes().len(),
        repo.all_permission_codes().await.unwrap().len()
    );
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn warehouse_admin_adjusts_only_its_warehouse(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let w2 = warehouse(&pool, "WH-002").await;
    let caller = user_with_role(&pool, "wh1@pharmacy.com", "warehouse_admin", Some(w1)).await;

    assert!(caller.authorize(actions::INVENTORY_ADJUST, ResourceOwner::warehouse(w1)).is_ok());
    assert!(matches!(
        caller.authorize(actions::INVENTORY_ADJUST, ResourceOwner::warehouse(w2)),
        Err(AppError::Forbidden(_))
    ));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn granting_the_same_pair_twice_conflicts(pool: PgPool) {
    let repo = synced(&pool).await;
    let service = RbacService::new(repo, pool.clone());

    let role = service
        .create_role(role_payload("catalog_clerk", &["medicines.view"]))
        .await
        .unwrap();
    let again = service.grant_permission(role.role.id, "medicines.view").await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let missing = service.revoke_permission(role.role.id, "medicines.edit").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn role_in_use_cannot_be_deleted(pool: PgPool) {
    let repo = synced(&pool).await;
    let service = RbacService::new(repo, pool.clone());

    service
        .create_role(role_payload("auditor", &["audit.view"]))
        .await
        .unwrap();
    let caller = user_with_role(&pool, "aud@pharmacy.com", "auditor", None).await;
    let role_id = caller.user.role_id.unwrap();

    assert!(matches!(service.delete_role(role_id).await, Err(AppError::Conflict(_))));
    assert!(service.get_role(role_id).await.is_ok());
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn system_role_rejects_edit_and_delete(pool: PgPool) {
    let repo = synced(&pool).await;
    let service = RbacService::new(repo.clone(), pool.clone());
    let root = repo.find_role_by_name(&pool, "super_admin").await.unwrap().unwrap();

    let edit = service
        .update_role(
            root.id,
            UpdateRolePayload {
                name: Some("root".into()),
                description: None,
                is_creatable: None,
                permissions: None,
            },
        )
        .await;
    assert!(matches!(edit, Err(AppError::SystemRoleImmutable)));
    assert!(matches!(service.delete_role(root.id).await, Err(AppError::SystemRoleImmutable)));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn shop_codes_are_refused_on_warehouse_roles(pool: PgPool) {
    let repo = synced(&pool).await;
    let service = RbacService::new(repo, pool.clone());

    let mut payload = role_payload("picker", &["inventory.view.shop"]);
    payload.entity_type = Some(RoleEntityType::Warehouse);
    assert!(matches!(service.create_role(payload).await, Err(AppError::InvalidInput(_))));

    let unknown = role_payload("ghost", &["inventory.teleport"]);
    assert!(matches!(service.create_role(unknown).await, Err(AppError::InvalidInput(_))));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn legacy_role_resolves_by_name_and_is_backfilled(pool: PgPool) {
    let repo = synced(&pool).await;
    let w1 = warehouse(&pool, "WH-010").await;
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, full_name, legacy_role, assigned_warehouse_id)
         VALUES ('old@pharmacy.com', 'hash', 'Antigo', 'warehouse_admin', $1) RETURNING id",
    )
    .bind(w1)
    .fetch_one(&pool)
    .await
    .unwrap();

    let service = RbacService::new(repo.clone(), pool.clone());
    let users = UserRepository::new(pool.clone());

    let before = users.find_by_id(user_id).await.unwrap().unwrap();
    assert!(before.role_id.is_none());
    let (role, permissions) = service.resolve(&before).await.unwrap();
    assert_eq!(role.map(|r| r.name).as_deref(), Some("warehouse_admin"));
    assert!(permissions.contains("inventory.adjust.warehouse"));

    assert_eq!(service.backfill_legacy_roles().await.unwrap(), 1);
    let after = users.find_by_id(user_id).await.unwrap().unwrap();
    let expected = repo.find_role_by_name(&pool, "warehouse_admin").await.unwrap().unwrap();
    assert_eq!(after.role_id, Some(expected.id));
}

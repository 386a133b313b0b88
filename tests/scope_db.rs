//! Escopo de local nos serviços, contra um Postgres real (`DATABASE_URL`).
//!
//! Rodar com `cargo test -- --ignored`.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pharma_backend::{
    common::{error::AppError, response::PageParams},
    db::{
        user_repo::NewUser, DispatchRepository, InventoryRepository, MedicineRepository, OrganizationRepository,
        RbacRepository, SessionRepository, UserRepository,
    },
    models::{
        auth::{ClientInfo, CreateUserPayload},
        dispatch::{CreateDispatchPayload, DispatchItemPayload},
        inventory::{
            AdjustStockPayload, AlertFilter, AlertType, MovementFilter, MovementType, StockEntryPayload,
            StockLocation,
        },
    },
    services::{
        access::Caller,
        auth::{hash_password, TokenLifetimes},
        registry::Registry,
        AuthService, DispatchService, InventoryService, OrganizationService, RbacService, UserService,
    },
};

async fn synced(pool: &PgPool) {
    let repo = RbacRepository::new(pool.clone());
    Registry::embedded().unwrap().sync(pool, &repo).await.unwrap();
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

async fn shop(pool: &PgPool, code: &str, warehouse_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO medical_shops (name, code, license_number, address, city, state, pincode, phone, warehouse_id)
         VALUES ($1, $1, 'LIC-' || $1, 'Rua da Farmácia, 7', 'Pune', 'MH', '411002', '9800000000', $2)
         RETURNING id",
    )
    .bind(code)
    .bind(warehouse_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

// Medicamento com nível de reposição 50 e um lote com a validade pedida
async fn batch(pool: &PgPool, number: &str, expiry: NaiveDate) -> Uuid {
    let medicine_id: Uuid = sqlx::query_scalar(
        "INSERT INTO medicines (name, generic_name, manufacturer, mrp, purchase_price, reorder_level)
         VALUES ($1, 'Paracetamol', 'Cipla', 35.50, 22.00, 50) RETURNING id",
    )
    .bind(format!("Paracetamol {}", number))
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO batches (medicine_id, batch_number, manufacturing_date, expiry_date, purchase_price, mrp)
         VALUES ($1, $2, $3, $4, 22.00, 35.50) RETURNING id",
    )
    .bind(medicine_id)
    .bind(number)
    .bind(expiry - Duration::days(720))
    .bind(expiry)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn in_days(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

async fn caller(
    pool: &PgPool,
    email: &str,
    role_name: &str,
    warehouse_id: Option<Uuid>,
    shop_id: Option<Uuid>,
) -> Caller {
    let repo = RbacRepository::new(pool.clone());
    let role = repo.find_role_by_name(pool, role_name).await.unwrap().unwrap();
    let password_hash = hash_password("senha-forte-1").await.unwrap();
    let user = UserRepository::new(pool.clone())
        .create_user(
            pool,
            NewUser {
                email,
                password_hash: &password_hash,
                full_name: "Teste",
                phone: None,
                legacy_role: None,
                role_id: role.id,
                assigned_warehouse_id: warehouse_id,
                assigned_shop_id: shop_id,
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

fn user_service(pool: &PgPool) -> UserService {
    UserService::new(
        UserRepository::new(pool.clone()),
        RbacRepository::new(pool.clone()),
        OrganizationRepository::new(pool.clone()),
        SessionRepository::new(pool.clone()),
        pool.clone(),
    )
}

fn inventory_service(pool: &PgPool) -> InventoryService {
    InventoryService::new(
        InventoryRepository::new(pool.clone()),
        MedicineRepository::new(pool.clone()),
        OrganizationRepository::new(pool.clone()),
        pool.clone(),
    )
}

fn dispatch_service(pool: &PgPool) -> DispatchService {
    DispatchService::new(
        DispatchRepository::new(pool.clone()),
        InventoryRepository::new(pool.clone()),
        MedicineRepository::new(pool.clone()),
        OrganizationRepository::new(pool.clone()),
        pool.clone(),
    )
}

fn auth_service(pool: &PgPool) -> AuthService {
    AuthService::new(
        UserRepository::new(pool.clone()),
        SessionRepository::new(pool.clone()),
        RbacRepository::new(pool.clone()),
        "segredo-de-teste".into(),
        TokenLifetimes {
            access: Duration::minutes(30),
            refresh: Duration::days(7),
        },
        pool.clone(),
    )
}

async fn role_id(pool: &PgPool, name: &str) -> Uuid {
    RbacRepository::new(pool.clone())
        .find_role_by_name(pool, name)
        .await
        .unwrap()
        .unwrap()
        .id
}

fn new_user(email: &str, role_id: Uuid, warehouse_id: Option<Uuid>, shop_id: Option<Uuid>) -> CreateUserPayload {
    CreateUserPayload {
        email: email.into(),
        password: "senha-forte-1".into(),
        full_name: "Novo Usuário".into(),
        phone: None,
        role_id,
        assigned_warehouse_id: warehouse_id,
        assigned_shop_id: shop_id,
    }
}

fn entry(batch_id: Uuid, quantity: i32) -> StockEntryPayload {
    StockEntryPayload {
        batch_id,
        quantity,
        notes: None,
    }
}

// ---
// Usuários
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn shop_admin_cannot_attach_a_foreign_warehouse(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let w2 = warehouse(&pool, "WH-002").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let admin = caller(&pool, "loja@pharmacy.com", "pharmacy_admin", Some(w1), Some(s1)).await;
    let service = user_service(&pool);
    let warehouse_admin = role_id(&pool, "warehouse_admin").await;

    let mismatched = service
        .create_user(&admin, new_user("a@pharmacy.com", warehouse_admin, Some(w2), Some(s1)))
        .await;
    assert!(matches!(mismatched, Err(AppError::InvalidInput(_))));

    // Mesmo no armazém certo, um cargo de armazém passa do alcance da loja
    let wider = service
        .create_user(&admin, new_user("b@pharmacy.com", warehouse_admin, Some(w1), Some(s1)))
        .await;
    assert!(matches!(wider, Err(AppError::Forbidden(_))));
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn shop_user_gets_the_shop_warehouse(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let admin = caller(&pool, "loja@pharmacy.com", "pharmacy_admin", Some(w1), Some(s1)).await;
    let employee = role_id(&pool, "pharmacy_employee").await;

    let created = user_service(&pool)
        .create_user(&admin, new_user("caixa@pharmacy.com", employee, None, Some(s1)))
        .await
        .unwrap();
    assert_eq!(created.assigned_warehouse_id, Some(w1));
    assert_eq!(created.assigned_shop_id, Some(s1));
}

// ---
// Armazéns
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn warehouse_with_shops_cannot_be_deleted(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    shop(&pool, "SH-001", w1).await;
    let root = caller(&pool, "root@pharmacy.com", "super_admin", None, None).await;
    let service = OrganizationService::new(OrganizationRepository::new(pool.clone()), pool.clone());

    assert!(matches!(service.delete_warehouse(&root, w1).await, Err(AppError::Conflict(_))));
    assert!(service.get_warehouse(&root, w1).await.is_ok());
}

// ---
// Estoque
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn warehouse_admin_sees_and_adjusts_its_shops(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let inventory = inventory_service(&pool);

    inventory.stock_entry(&admin, w1, entry(b1, 100)).await.unwrap();
    dispatch_service(&pool)
        .create_dispatch(
            &admin,
            CreateDispatchPayload {
                warehouse_id: w1,
                shop_id: s1,
                items: vec![DispatchItemPayload {
                    batch_id: b1,
                    quantity: 20,
                }],
                notes: None,
            },
        )
        .await
        .unwrap();

    let shop_stock = inventory
        .get_stock(&admin, StockLocation::Shop, s1, PageParams::default())
        .await
        .unwrap();
    assert_eq!(shop_stock.total, 1);

    let level = inventory
        .adjust_stock(
            &admin,
            AdjustStockPayload {
                location_type: StockLocation::Shop,
                location_id: s1,
                batch_id: b1,
                delta: -5,
                reason: "quebra no balcão".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(level.quantity, 15);

    // O ajuste na loja aparece no livro do armazém
    let ledger = inventory
        .list_movements(
            &admin,
            MovementFilter {
                movement_type: Some(MovementType::Adjustment),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(ledger.total, 1);
    assert_eq!(ledger.items[0].source_id, Some(s1));
    assert_eq!(ledger.items[0].quantity, -5);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn adjustment_below_zero_changes_nothing(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let inventory = inventory_service(&pool);

    inventory.stock_entry(&admin, w1, entry(b1, 10)).await.unwrap();
    let result = inventory
        .adjust_stock(
            &admin,
            AdjustStockPayload {
                location_type: StockLocation::Warehouse,
                location_id: w1,
                batch_id: b1,
                delta: -11,
                reason: "contagem".into(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let stock = inventory
        .get_stock(&admin, StockLocation::Warehouse, w1, PageParams::default())
        .await
        .unwrap();
    assert_eq!(stock.items[0].quantity, 10);

    let adjustments = inventory
        .list_movements(
            &admin,
            MovementFilter {
                movement_type: Some(MovementType::Adjustment),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(adjustments.total, 0);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn stock_entry_overflow_is_invalid_input(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let inventory = inventory_service(&pool);

    inventory.stock_entry(&admin, w1, entry(b1, 2_000_000_000)).await.unwrap();
    let overflow = inventory.stock_entry(&admin, w1, entry(b1, 2_000_000_000)).await;
    assert!(matches!(overflow, Err(AppError::InvalidInput(_))));
}

// ---
// Remessas
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn dispatch_moves_stock_from_warehouse_to_shop(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let inventory = inventory_service(&pool);
    let dispatches = dispatch_service(&pool);

    inventory.stock_entry(&admin, w1, entry(b1, 100)).await.unwrap();
    let detail = dispatches
        .create_dispatch(
            &admin,
            CreateDispatchPayload {
                warehouse_id: w1,
                shop_id: s1,
                items: vec![DispatchItemPayload {
                    batch_id: b1,
                    quantity: 30,
                }],
                notes: Some("reposição semanal".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
    assert!(detail.dispatch.dispatch_number.starts_with("DSP-"));

    let warehouse_stock = inventory
        .get_stock(&admin, StockLocation::Warehouse, w1, PageParams::default())
        .await
        .unwrap();
    assert_eq!(warehouse_stock.items[0].quantity, 70);
    let shop_stock = inventory
        .get_stock(&admin, StockLocation::Shop, s1, PageParams::default())
        .await
        .unwrap();
    assert_eq!(shop_stock.items[0].quantity, 30);

    let transfers = inventory
        .list_movements(
            &admin,
            MovementFilter {
                shop_id: Some(s1),
                movement_type: Some(MovementType::Transfer),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(transfers.total, 1);
    assert_eq!(transfers.items[0].reference_id, Some(detail.dispatch.id));

    let fetched = dispatches.get_dispatch(&admin, detail.dispatch.id).await.unwrap();
    assert_eq!(fetched.items[0].quantity, 30);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn dispatch_is_all_or_nothing(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let w2 = warehouse(&pool, "WH-002").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let s2 = shop(&pool, "SH-002", w2).await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let b2 = batch(&pool, "B-002", in_days(400)).await;
    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let inventory = inventory_service(&pool);
    let dispatches = dispatch_service(&pool);

    inventory.stock_entry(&admin, w1, entry(b1, 10)).await.unwrap();
    inventory.stock_entry(&admin, w1, entry(b2, 10)).await.unwrap();

    let item = |batch_id, quantity| DispatchItemPayload { batch_id, quantity };

    let other_warehouse_shop = dispatches
        .create_dispatch(
            &admin,
            CreateDispatchPayload {
                warehouse_id: w1,
                shop_id: s2,
                items: vec![item(b1, 1)],
                notes: None,
            },
        )
        .await;
    assert!(matches!(other_warehouse_shop, Err(AppError::InvalidInput(_))));

    // Segundo item sem saldo: o primeiro também não sai
    let short = dispatches
        .create_dispatch(
            &admin,
            CreateDispatchPayload {
                warehouse_id: w1,
                shop_id: s1,
                items: vec![item(b1, 5), item(b2, 11)],
                notes: None,
            },
        )
        .await;
    assert!(matches!(short, Err(AppError::InvalidInput(_))));

    let warehouse_stock = inventory
        .get_stock(&admin, StockLocation::Warehouse, w1, PageParams::default())
        .await
        .unwrap();
    assert!(warehouse_stock.items.iter().all(|level| level.quantity == 10));
    let shop_stock = inventory
        .get_stock(&admin, StockLocation::Shop, s1, PageParams::default())
        .await
        .unwrap();
    assert_eq!(shop_stock.total, 0);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn shop_staff_cannot_dispatch(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let s1 = shop(&pool, "SH-001", w1).await;
    let b1 = batch(&pool, "B-001", in_days(400)).await;
    let pharmacist = caller(&pool, "loja@pharmacy.com", "pharmacy_admin", Some(w1), Some(s1)).await;

    let result = dispatch_service(&pool)
        .create_dispatch(
            &pharmacist,
            CreateDispatchPayload {
                warehouse_id: w1,
                shop_id: s1,
                items: vec![DispatchItemPayload {
                    batch_id: b1,
                    quantity: 1,
                }],
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

// ---
// Alertas
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn alerts_cover_low_expiring_and_expired(pool: PgPool) {
    synced(&pool).await;
    let w1 = warehouse(&pool, "WH-001").await;
    let w2 = warehouse(&pool, "WH-002").await;
    let healthy = batch(&pool, "B-OK", in_days(400)).await;
    let soon = batch(&pool, "B-SOON", in_days(10)).await;
    let old = batch(&pool, "B-OLD", in_days(-1)).await;
    let root = caller(&pool, "root@pharmacy.com", "super_admin", None, None).await;
    let inventory = inventory_service(&pool);

    inventory.stock_entry(&root, w1, entry(healthy, 500)).await.unwrap();
    inventory.stock_entry(&root, w1, entry(soon, 20)).await.unwrap();
    inventory.stock_entry(&root, w1, entry(old, 5)).await.unwrap();
    inventory.stock_entry(&root, w2, entry(old, 5)).await.unwrap();

    let admin = caller(&pool, "wh@pharmacy.com", "warehouse_admin", Some(w1), None).await;
    let alerts = inventory.list_alerts(&admin, AlertFilter::default()).await.unwrap();

    let kinds = |batch_id: Uuid| -> Vec<AlertType> {
        alerts
            .iter()
            .filter(|a| a.batch_id == batch_id)
            .map(|a| a.alert_type)
            .collect()
    };
    assert!(kinds(healthy).is_empty());
    assert_eq!(kinds(soon), vec![AlertType::LowStock, AlertType::Expiring]);
    assert_eq!(kinds(old), vec![AlertType::Expired]);
    assert!(alerts.iter().all(|a| a.location_id == w1));

    let expired_only = inventory
        .list_alerts(
            &admin,
            AlertFilter {
                alert_type: Some(AlertType::Expired),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(expired_only.len(), 1);

    let outside = inventory
        .list_alerts(
            &admin,
            AlertFilter {
                warehouse_id: Some(w2),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(outside, Err(AppError::Forbidden(_))));
}

// ---
// Sessões
// ---

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn concurrent_refresh_rotates_once(pool: PgPool) {
    synced(&pool).await;
    let user = caller(&pool, "wh@pharmacy.com", "warehouse_admin", None, None).await.user;
    let sessions = SessionRepository::new(pool.clone());
    let client = ClientInfo::default();
    sessions
        .create_session(&pool, user.id, "token-de-refresh", Utc::now() + Duration::days(1), &client)
        .await
        .unwrap();

    let auth = auth_service(&pool);
    let (a, b) = tokio::join!(
        auth.refresh("token-de-refresh", &client),
        auth.refresh("token-de-refresh", &client)
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(a.err().or(b.err()), Some(AppError::InvalidToken)));
    assert_eq!(sessions.count_user_sessions(user.id).await.unwrap(), 1);
}

#[sqlx::test]
#[ignore = "requer DATABASE_URL"]
async fn password_reset_token_is_single_use(pool: PgPool) {
    synced(&pool).await;
    let user = caller(&pool, "wh@pharmacy.com", "warehouse_admin", None, None).await.user;
    let client = ClientInfo::default();
    let auth = auth_service(&pool);

    auth.login_user(&user.email, "senha-forte-1", &client).await.unwrap();
    assert!(auth.request_password_reset("ninguem@pharmacy.com").await.unwrap().is_none());

    let token = auth.request_password_reset(&user.email).await.unwrap().unwrap();
    auth.confirm_password_reset(&token, "senha-nova-22", &client)
        .await
        .unwrap();

    let sessions = SessionRepository::new(pool.clone());
    assert_eq!(sessions.count_user_sessions(user.id).await.unwrap(), 0);

    let again = auth.confirm_password_reset(&token, "outra-senha-3", &client).await;
    assert!(matches!(again, Err(AppError::InvalidInput(_))));

    assert!(matches!(
        auth.login_user(&user.email, "senha-forte-1", &client).await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(auth.login_user(&user.email, "senha-nova-22", &client).await.is_ok());
}

// src/db/inventory_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageParams},
    models::inventory::{
        AlertCandidate, MovementFilter, NewStockMovement, StockLevel, StockLocation, StockMovement,
    },
    services::access::LocationFilter,
};

const MOVEMENT_COLUMNS: &str = "id, movement_type, source_type, source_id, destination_type, destination_id, \
     medicine_id, batch_id, quantity, reference_type, reference_id, notes, created_by, created_at";

// Um movimento "pertence" a um local se ele é origem ou destino.
// No filtro de armazém entram também as lojas abastecidas por ele.
const MOVEMENT_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL
           OR (source_type = 'warehouse' AND source_id = $1)
           OR (destination_type = 'warehouse' AND destination_id = $1)
           OR (source_type = 'shop'
               AND source_id IN (SELECT id FROM medical_shops WHERE warehouse_id = $1))
           OR (destination_type = 'shop'
               AND destination_id IN (SELECT id FROM medical_shops WHERE warehouse_id = $1)))
      AND ($2::uuid IS NULL
           OR (source_type = 'shop' AND source_id = $2)
           OR (destination_type = 'shop' AND destination_id = $2))
      AND ($3::movement_type IS NULL OR movement_type = $3)
      AND ($4::uuid IS NULL OR medicine_id = $4)
"#;

// Saldo positivo nos dois tipos de estoque, com o armazém dono de cada linha
const ALERT_CANDIDATES: &str = r#"
    SELECT * FROM (
        SELECT 'warehouse' AS location_type, ws.warehouse_id AS location_id, ws.warehouse_id AS owner_warehouse_id,
               ws.medicine_id, m.name AS medicine_name, ws.batch_id, b.batch_number, b.expiry_date,
               ws.quantity, m.reorder_level
        FROM warehouse_stock ws
        JOIN medicines m ON m.id = ws.medicine_id
        JOIN batches b ON b.id = ws.batch_id
        WHERE ws.quantity > 0
        UNION ALL
        SELECT 'shop', ss.shop_id, s.warehouse_id,
               ss.medicine_id, m.name, ss.batch_id, b.batch_number, b.expiry_date,
               ss.quantity, m.reorder_level
        FROM shop_stock ss
        JOIN medical_shops s ON s.id = ss.shop_id
        JOIN medicines m ON m.id = ss.medicine_id
        JOIN batches b ON b.id = ss.batch_id
        WHERE ss.quantity > 0
    ) AS stock
    WHERE ($1::uuid IS NULL OR owner_warehouse_id = $1)
      AND ($2::uuid IS NULL OR (location_type = 'shop' AND location_id = $2))
      AND (quantity <= reorder_level OR expiry_date <= $3)
    ORDER BY expiry_date, medicine_name
"#;

// Tabela e coluna de local de cada tipo de estoque
fn stock_table(location: StockLocation) -> (&'static str, &'static str) {
    match location {
        StockLocation::Warehouse => ("warehouse_stock", "warehouse_id"),
        StockLocation::Shop => ("shop_stock", "shop_id"),
    }
}

// Linha travada para ajuste
#[derive(Debug, Clone, FromRow)]
pub struct LockedStock {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_stock(
        &self,
        location: StockLocation,
        location_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<StockLevel>, i64), AppError> {
        let (table, column) = stock_table(location);

        let items = sqlx::query_as::<_, StockLevel>(&format!(
            r#"
            SELECT st.id, st.{column} AS location_id, st.medicine_id, m.name AS medicine_name,
                   st.batch_id, b.batch_number, b.expiry_date,
                   st.quantity, st.reserved_quantity, st.updated_at
            FROM {table} st
            JOIN medicines m ON m.id = st.medicine_id
            JOIN batches b ON b.id = st.batch_id
            WHERE st.{column} = $1
            ORDER BY m.name, b.expiry_date
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(location_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1"))
            .bind(location_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    /// Soma no estoque do local, criando a linha se preciso (UPSERT atômico).
    pub async fn add_stock<'e, E>(
        &self,
        executor: E,
        location: StockLocation,
        location_id: Uuid,
        medicine_id: Uuid,
        batch_id: Uuid,
        quantity: i32,
    ) -> Result<StockLevel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, column) = stock_table(location);
        let level = sqlx::query_as::<_, StockLevel>(&format!(
            r#"
            WITH up AS (
                INSERT INTO {table} ({column}, medicine_id, batch_id, quantity)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ({column}, medicine_id, batch_id)
                DO UPDATE SET
                    quantity = {table}.quantity + EXCLUDED.quantity,
                    updated_at = NOW()
                RETURNING *
            )
            SELECT up.id, up.{column} AS location_id, up.medicine_id, m.name AS medicine_name,
                   up.batch_id, b.batch_number, b.expiry_date,
                   up.quantity, up.reserved_quantity, up.updated_at
            FROM up
            JOIN medicines m ON m.id = up.medicine_id
            JOIN batches b ON b.id = up.batch_id
            "#
        ))
        .bind(location_id)
        .bind(medicine_id)
        .bind(batch_id)
        .bind(quantity)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_out_of_range(e, "Quantidade excede o limite do estoque."))?;

        Ok(level)
    }

    /// `SELECT ... FOR UPDATE`: segura a linha até o fim da transação.
    pub async fn lock_stock<'e, E>(
        &self,
        executor: E,
        location: StockLocation,
        location_id: Uuid,
        batch_id: Uuid,
    ) -> Result<Option<LockedStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, column) = stock_table(location);
        let row = sqlx::query_as::<_, LockedStock>(&format!(
            "SELECT id, medicine_id, quantity FROM {table} WHERE {column} = $1 AND batch_id = $2 FOR UPDATE"
        ))
        .bind(location_id)
        .bind(batch_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn set_stock_quantity<'e, E>(
        &self,
        executor: E,
        location: StockLocation,
        stock_id: Uuid,
        quantity: i32,
    ) -> Result<StockLevel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, column) = stock_table(location);
        let level = sqlx::query_as::<_, StockLevel>(&format!(
            r#"
            WITH up AS (
                UPDATE {table} SET quantity = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT up.id, up.{column} AS location_id, up.medicine_id, m.name AS medicine_name,
                   up.batch_id, b.batch_number, b.expiry_date,
                   up.quantity, up.reserved_quantity, up.updated_at
            FROM up
            JOIN medicines m ON m.id = up.medicine_id
            JOIN batches b ON b.id = up.batch_id
            "#
        ))
        .bind(stock_id)
        .bind(quantity)
        .fetch_one(executor)
        .await?;
        Ok(level)
    }

    /// Registra uma movimentação no livro-razão.
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        movement: &NewStockMovement<'_>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (source_type, source_id) = movement.source.unzip();
        let (destination_type, destination_id) = movement.destination.unzip();

        let recorded = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            INSERT INTO stock_movements (
                movement_type, source_type, source_id, destination_type, destination_id,
                medicine_id, batch_id, quantity, reference_type, reference_id, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(movement.movement_type)
        .bind(source_type)
        .bind(source_id.flatten())
        .bind(destination_type)
        .bind(destination_id.flatten())
        .bind(movement.medicine_id)
        .bind(movement.batch_id)
        .bind(movement.quantity)
        .bind(movement.reference_type)
        .bind(movement.reference_id)
        .bind(movement.notes)
        .bind(movement.created_by)
        .fetch_one(executor)
        .await?;

        Ok(recorded)
    }

    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        location: LocationFilter,
        page: &PageParams,
    ) -> Result<(Vec<StockMovement>, i64), AppError> {
        let items = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements {MOVEMENT_WHERE} ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(location.warehouse_id)
        .bind(location.shop_id)
        .bind(filter.movement_type)
        .bind(filter.medicine_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM stock_movements {MOVEMENT_WHERE}"))
            .bind(location.warehouse_id)
            .bind(location.shop_id)
            .bind(filter.movement_type)
            .bind(filter.medicine_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    /// Linhas que podem disparar alerta até `horizon` (validade) ou abaixo do nível de reposição.
    pub async fn list_alert_candidates(
        &self,
        location: LocationFilter,
        horizon: NaiveDate,
    ) -> Result<Vec<AlertCandidate>, AppError> {
        let rows = sqlx::query_as::<_, AlertCandidate>(ALERT_CANDIDATES)
            .bind(location.warehouse_id)
            .bind(location.shop_id)
            .bind(horizon)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

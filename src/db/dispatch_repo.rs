// src/db/dispatch_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageParams},
    models::dispatch::{Dispatch, DispatchFilter, DispatchItem},
    services::access::LocationFilter,
};

const DISPATCH_COLUMNS: &str = "id, dispatch_number, warehouse_id, shop_id, status, dispatched_by, received_by, \
     dispatched_at, delivered_at, notes, created_at";

const DISPATCH_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR warehouse_id = $1)
      AND ($2::uuid IS NULL OR shop_id = $2)
      AND ($3::dispatch_status IS NULL OR status = $3)
"#;

// Remessas armazém -> loja
#[derive(Clone)]
pub struct DispatchRepository {
    pool: PgPool,
}

impl DispatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava a remessa já como `dispatched`: o estoque sai na mesma transação.
    pub async fn create_dispatch<'e, E>(
        &self,
        executor: E,
        dispatch_number: &str,
        warehouse_id: Uuid,
        shop_id: Uuid,
        dispatched_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Dispatch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let dispatch = sqlx::query_as::<_, Dispatch>(&format!(
            r#"
            INSERT INTO dispatches (dispatch_number, warehouse_id, shop_id, status, dispatched_by, dispatched_at, notes)
            VALUES ($1, $2, $3, 'dispatched', $4, NOW(), $5)
            RETURNING {DISPATCH_COLUMNS}
            "#
        ))
        .bind(dispatch_number)
        .bind(warehouse_id)
        .bind(shop_id)
        .bind(dispatched_by)
        .bind(notes)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Número de remessa já existe."))?;

        Ok(dispatch)
    }

    pub async fn add_item<'e, E>(
        &self,
        executor: E,
        dispatch_id: Uuid,
        medicine_id: Uuid,
        batch_id: Uuid,
        quantity: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO dispatch_items (dispatch_id, medicine_id, batch_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(dispatch_id)
        .bind(medicine_id)
        .bind(batch_id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_dispatch(&self, id: Uuid) -> Result<Option<Dispatch>, AppError> {
        let dispatch = sqlx::query_as::<_, Dispatch>(&format!("SELECT {DISPATCH_COLUMNS} FROM dispatches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dispatch)
    }

    pub async fn list_items(&self, dispatch_id: Uuid) -> Result<Vec<DispatchItem>, AppError> {
        let items = sqlx::query_as::<_, DispatchItem>(
            r#"
            SELECT di.id, di.dispatch_id, di.medicine_id, m.name AS medicine_name,
                   di.batch_id, b.batch_number, b.expiry_date, di.quantity
            FROM dispatch_items di
            JOIN medicines m ON m.id = di.medicine_id
            JOIN batches b ON b.id = di.batch_id
            WHERE di.dispatch_id = $1
            ORDER BY m.name
            "#,
        )
        .bind(dispatch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_dispatches(
        &self,
        filter: &DispatchFilter,
        location: LocationFilter,
        page: &PageParams,
    ) -> Result<(Vec<Dispatch>, i64), AppError> {
        let items = sqlx::query_as::<_, Dispatch>(&format!(
            "SELECT {DISPATCH_COLUMNS} FROM dispatches {DISPATCH_WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(location.warehouse_id)
        .bind(location.shop_id)
        .bind(filter.status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM dispatches {DISPATCH_WHERE}"))
            .bind(location.warehouse_id)
            .bind(location.shop_id)
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }
}

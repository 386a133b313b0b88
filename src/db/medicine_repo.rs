// src/db/medicine_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageParams},
    models::inventory::{
        Batch, CreateBatchPayload, CreateMedicinePayload, Medicine, MedicineFilter, MedicineType,
        UpdateMedicinePayload,
    },
};

const MEDICINE_COLUMNS: &str = "id, name, generic_name, brand, manufacturer, medicine_type, category, \
     strength, unit, pack_size, hsn_code, gst_rate, mrp, purchase_price, is_prescription_required, \
     reorder_level, is_active, created_at, updated_at";

const BATCH_COLUMNS: &str = "id, medicine_id, batch_number, manufacturing_date, expiry_date, \
     purchase_price, mrp, supplier, created_at";

const MEDICINE_WHERE: &str = r#"
    WHERE ($1::medicine_type IS NULL OR medicine_type = $1)
      AND ($2::boolean IS NULL OR is_active = $2)
      AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%'
                            OR generic_name ILIKE '%' || $3 || '%'
                            OR brand ILIKE '%' || $3 || '%')
"#;

#[derive(Clone)]
pub struct MedicineRepository {
    pool: PgPool,
}

impl MedicineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &MedicineFilter, page: &PageParams) -> Result<(Vec<Medicine>, i64), AppError> {
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let items = sqlx::query_as::<_, Medicine>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines {MEDICINE_WHERE} ORDER BY name LIMIT $4 OFFSET $5"
        ))
        .bind(filter.medicine_type)
        .bind(filter.is_active)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM medicines {MEDICINE_WHERE}"))
            .bind(filter.medicine_type)
            .bind(filter.is_active)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Medicine>, AppError> {
        let medicine = sqlx::query_as::<_, Medicine>(&format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CreateMedicinePayload) -> Result<Medicine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            INSERT INTO medicines (
                name, generic_name, brand, manufacturer, medicine_type, category, strength,
                unit, pack_size, hsn_code, gst_rate, mrp, purchase_price,
                is_prescription_required, reorder_level
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(&payload.generic_name)
        .bind(payload.brand.as_deref())
        .bind(&payload.manufacturer)
        .bind(payload.medicine_type.unwrap_or(MedicineType::Tablet))
        .bind(payload.category.as_deref())
        .bind(payload.strength.as_deref())
        .bind(payload.unit.as_deref().unwrap_or("strip"))
        .bind(payload.pack_size.unwrap_or(10))
        .bind(payload.hsn_code.as_deref())
        .bind(payload.gst_rate.unwrap_or(Decimal::new(1200, 2)))
        .bind(payload.mrp)
        .bind(payload.purchase_price)
        .bind(payload.is_prescription_required)
        .bind(payload.reorder_level.unwrap_or(50))
        .fetch_one(executor)
        .await?;

        Ok(medicine)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateMedicinePayload,
    ) -> Result<Medicine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            UPDATE medicines
            SET name = COALESCE($2, name),
                brand = COALESCE($3, brand),
                category = COALESCE($4, category),
                gst_rate = COALESCE($5, gst_rate),
                mrp = COALESCE($6, mrp),
                purchase_price = COALESCE($7, purchase_price),
                is_prescription_required = COALESCE($8, is_prescription_required),
                reorder_level = COALESCE($9, reorder_level),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.brand.as_deref())
        .bind(payload.category.as_deref())
        .bind(payload.gst_rate)
        .bind(payload.mrp)
        .bind(payload.purchase_price)
        .bind(payload.is_prescription_required)
        .bind(payload.reorder_level)
        .bind(payload.is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Medicamento"))?;
        Ok(medicine)
    }

    // ---
    // Lotes
    // ---

    pub async fn list_batches(&self, medicine_id: Uuid) -> Result<Vec<Batch>, AppError> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE medicine_id = $1 ORDER BY expiry_date"
        ))
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    pub async fn find_batch<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(&format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(batch)
    }

    pub async fn create_batch<'e, E>(
        &self,
        executor: E,
        medicine_id: Uuid,
        payload: &CreateBatchPayload,
    ) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            r#"
            INSERT INTO batches (medicine_id, batch_number, manufacturing_date, expiry_date, purchase_price, mrp, supplier)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(medicine_id)
        .bind(payload.batch_number.trim())
        .bind(payload.manufacturing_date)
        .bind(payload.expiry_date)
        .bind(payload.purchase_price)
        .bind(payload.mrp)
        .bind(payload.supplier.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Esse lote já existe para o medicamento."))?;
        Ok(batch)
    }
}

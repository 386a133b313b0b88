// src/db/organization_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageParams},
    models::organization::{
        CreateShopPayload, CreateWarehousePayload, MedicalShop, ShopFilter, UpdateShopPayload,
        UpdateWarehousePayload, Warehouse, WarehouseDetail, WarehouseFilter,
    },
    services::access::LocationFilter,
};

const WAREHOUSE_COLUMNS: &str = "w.id, w.name, w.code, w.address, w.city, w.state, w.country, \
     w.pincode, w.phone, w.email, w.capacity, w.status, w.created_at, w.updated_at";

const SHOP_COLUMNS: &str = "id, name, code, shop_type, license_number, license_expiry, gst_number, \
     address, city, state, country, pincode, phone, email, warehouse_id, status, created_at, updated_at";

const WAREHOUSE_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR w.id = $1)
      AND ($2::warehouse_status IS NULL OR w.status = $2)
      AND ($3::text IS NULL OR w.name ILIKE '%' || $3 || '%'
                            OR w.code ILIKE '%' || $3 || '%'
                            OR w.city ILIKE '%' || $3 || '%')
"#;

const SHOP_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR warehouse_id = $1)
      AND ($2::uuid IS NULL OR id = $2)
      AND ($3::shop_status IS NULL OR status = $3)
      AND ($4::text IS NULL OR name ILIKE '%' || $4 || '%' OR code ILIKE '%' || $4 || '%')
"#;

fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// Armazéns e lojas (dados mestre)
#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Armazéns
    // ---

    /// `only` restringe a um único armazém (escopo do usuário).
    pub async fn list_warehouses(
        &self,
        filter: &WarehouseFilter,
        only: Option<Uuid>,
        page: &PageParams,
    ) -> Result<(Vec<WarehouseDetail>, i64), AppError> {
        let search = search_term(&filter.search);

        let items = sqlx::query_as::<_, WarehouseDetail>(&format!(
            r#"
            SELECT {WAREHOUSE_COLUMNS},
                   (SELECT COUNT(*) FROM medical_shops s WHERE s.warehouse_id = w.id) AS shop_count
            FROM warehouses w
            {WAREHOUSE_WHERE}
            ORDER BY w.name
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(only)
        .bind(filter.status)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM warehouses w {WAREHOUSE_WHERE}"
        ))
        .bind(only)
        .bind(filter.status)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn find_warehouse(&self, id: Uuid) -> Result<Option<WarehouseDetail>, AppError> {
        let warehouse = sqlx::query_as::<_, WarehouseDetail>(&format!(
            r#"
            SELECT {WAREHOUSE_COLUMNS},
                   (SELECT COUNT(*) FROM medical_shops s WHERE s.warehouse_id = w.id) AS shop_count
            FROM warehouses w
            WHERE w.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(warehouse)
    }

    pub async fn warehouse_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn create_warehouse<'e, E>(
        &self,
        executor: E,
        payload: &CreateWarehousePayload,
    ) -> Result<Warehouse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            INSERT INTO warehouses AS w (name, code, address, city, state, country, pincode, phone, email, capacity)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'India'), $7, $8, $9, $10)
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(payload.code.trim().to_uppercase())
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(payload.country.as_deref())
        .bind(&payload.pincode)
        .bind(payload.phone.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.capacity)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um armazém com esse código."))?;

        Ok(warehouse)
    }

    pub async fn update_warehouse<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateWarehousePayload,
    ) -> Result<Warehouse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouses AS w
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                pincode = COALESCE($6, pincode),
                phone = COALESCE($7, phone),
                email = COALESCE($8, email),
                capacity = COALESCE($9, capacity),
                status = COALESCE($10, status),
                updated_at = NOW()
            WHERE w.id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.city.as_deref())
        .bind(payload.state.as_deref())
        .bind(payload.pincode.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.capacity)
        .bind(payload.status)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Armazém"))?;
        Ok(warehouse)
    }

    pub async fn count_warehouse_shops<'e, E>(&self, executor: E, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM medical_shops WHERE warehouse_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_warehouse<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                AppError::from_foreign_key_violation(e, "O armazém ainda possui usuários ou estoque vinculados.")
            })?;
        Ok(result.rows_affected())
    }

    // ---
    // Lojas
    // ---

    pub async fn list_shops(
        &self,
        filter: &ShopFilter,
        location: LocationFilter,
        page: &PageParams,
    ) -> Result<(Vec<MedicalShop>, i64), AppError> {
        let search = search_term(&filter.search);

        let items = sqlx::query_as::<_, MedicalShop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM medical_shops {SHOP_WHERE} ORDER BY name LIMIT $5 OFFSET $6"
        ))
        .bind(location.warehouse_id)
        .bind(location.shop_id)
        .bind(filter.status)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM medical_shops {SHOP_WHERE}"))
            .bind(location.warehouse_id)
            .bind(location.shop_id)
            .bind(filter.status)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn find_shop(&self, id: Uuid) -> Result<Option<MedicalShop>, AppError> {
        let shop = sqlx::query_as::<_, MedicalShop>(&format!("SELECT {SHOP_COLUMNS} FROM medical_shops WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shop)
    }

    pub async fn create_shop<'e, E>(&self, executor: E, payload: &CreateShopPayload) -> Result<MedicalShop, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shop = sqlx::query_as::<_, MedicalShop>(&format!(
            r#"
            INSERT INTO medical_shops (
                name, code, shop_type, license_number, license_expiry, gst_number,
                address, city, state, country, pincode, phone, email, warehouse_id
            )
            VALUES ($1, $2, COALESCE($3, 'retail'), $4, $5, $6, $7, $8, $9, COALESCE($10, 'India'), $11, $12, $13, $14)
            RETURNING {SHOP_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(payload.code.trim().to_uppercase())
        .bind(payload.shop_type.as_deref())
        .bind(&payload.license_number)
        .bind(payload.license_expiry)
        .bind(payload.gst_number.as_deref())
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(payload.country.as_deref())
        .bind(&payload.pincode)
        .bind(&payload.phone)
        .bind(payload.email.as_deref())
        .bind(payload.warehouse_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe uma loja com esse código."))?;

        Ok(shop)
    }

    pub async fn update_shop<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateShopPayload,
    ) -> Result<MedicalShop, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shop = sqlx::query_as::<_, MedicalShop>(&format!(
            r#"
            UPDATE medical_shops
            SET name = COALESCE($2, name),
                license_number = COALESCE($3, license_number),
                license_expiry = COALESCE($4, license_expiry),
                gst_number = COALESCE($5, gst_number),
                address = COALESCE($6, address),
                city = COALESCE($7, city),
                state = COALESCE($8, state),
                pincode = COALESCE($9, pincode),
                phone = COALESCE($10, phone),
                email = COALESCE($11, email),
                status = COALESCE($12, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SHOP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.license_number.as_deref())
        .bind(payload.license_expiry)
        .bind(payload.gst_number.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.city.as_deref())
        .bind(payload.state.as_deref())
        .bind(payload.pincode.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.status)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Loja"))?;
        Ok(shop)
    }

    pub async fn delete_shop<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM medical_shops WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                AppError::from_foreign_key_violation(e, "A loja ainda possui usuários ou estoque vinculados.")
            })?;
        Ok(result.rows_affected())
    }
}

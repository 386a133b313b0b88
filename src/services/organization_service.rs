// src/services/organization_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{PageParams, Paginated},
    },
    db::OrganizationRepository,
    models::{
        organization::{
            CreateShopPayload, CreateWarehousePayload, MedicalShop, ShopFilter, UpdateShopPayload,
            UpdateWarehousePayload, WarehouseDetail, WarehouseFilter,
        },
        rbac::actions,
    },
    services::access::{Caller, LocationFilter, ResourceOwner, ScopeGrant},
};

/// Uma loja pertence a ela mesma e ao armazém que a abastece.
fn shop_owner(shop: &MedicalShop) -> ResourceOwner {
    ResourceOwner::shop(shop.id, shop.warehouse_id)
}

#[derive(Clone)]
pub struct OrganizationService {
    repo: OrganizationRepository,
    pool: PgPool,
}

impl OrganizationService {
    pub fn new(repo: OrganizationRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    // ---
    // Armazéns
    // ---

    pub async fn list_warehouses(
        &self,
        caller: &Caller,
        filter: WarehouseFilter,
        page: PageParams,
    ) -> Result<Paginated<WarehouseDetail>, AppError> {
        let only = match caller.scope_grant(actions::WAREHOUSES_VIEW)? {
            ScopeGrant::Global => None,
            ScopeGrant::Warehouse(id) => Some(id),
            ScopeGrant::Shop(_) => {
                return Err(AppError::Forbidden(actions::WAREHOUSES_VIEW.to_string()));
            }
        };
        let (items, total) = self.repo.list_warehouses(&filter, only, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    pub async fn get_warehouse(&self, caller: &Caller, id: Uuid) -> Result<WarehouseDetail, AppError> {
        caller.authorize(actions::WAREHOUSES_VIEW, ResourceOwner::warehouse(id))?;
        self.repo
            .find_warehouse(id)
            .await?
            .ok_or(AppError::NotFound("Armazém"))
    }

    pub async fn create_warehouse(
        &self,
        caller: &Caller,
        payload: CreateWarehousePayload,
    ) -> Result<WarehouseDetail, AppError> {
        caller.authorize(actions::WAREHOUSES_CREATE, ResourceOwner::GLOBAL)?;
        let warehouse = self.repo.create_warehouse(&self.pool, &payload).await?;
        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Armazém criado");
        Ok(WarehouseDetail {
            warehouse,
            shop_count: 0,
        })
    }

    pub async fn update_warehouse(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateWarehousePayload,
    ) -> Result<WarehouseDetail, AppError> {
        caller.authorize(actions::WAREHOUSES_EDIT, ResourceOwner::warehouse(id))?;
        self.repo.update_warehouse(&self.pool, id, &payload).await?;
        self.repo
            .find_warehouse(id)
            .await?
            .ok_or(AppError::NotFound("Armazém"))
    }

    /// Recusa a exclusão enquanto houver lojas vinculadas.
    pub async fn delete_warehouse(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.authorize(actions::WAREHOUSES_DELETE, ResourceOwner::warehouse(id))?;

        let mut tx = self.pool.begin().await?;
        let shops = self.repo.count_warehouse_shops(&mut *tx, id).await?;
        if shops > 0 {
            return Err(AppError::Conflict(format!(
                "O armazém possui {} loja(s) vinculada(s).",
                shops
            )));
        }
        if self.repo.delete_warehouse(&mut *tx, id).await? == 0 {
            return Err(AppError::NotFound("Armazém"));
        }
        tx.commit().await?;

        tracing::info!(warehouse_id = %id, deleted_by = %caller.user.id, "Armazém excluído");
        Ok(())
    }

    pub async fn list_warehouse_shops(
        &self,
        caller: &Caller,
        warehouse_id: Uuid,
        page: PageParams,
    ) -> Result<Paginated<MedicalShop>, AppError> {
        if !self.repo.warehouse_exists(warehouse_id).await? {
            return Err(AppError::NotFound("Armazém"));
        }
        let location = caller.list_filter(
            actions::SHOPS_VIEW,
            LocationFilter {
                warehouse_id: Some(warehouse_id),
                shop_id: None,
            },
        )?;
        let (items, total) = self
            .repo
            .list_shops(&ShopFilter::default(), location, &page)
            .await?;
        Ok(Paginated::new(items, total, &page))
    }

    // ---
    // Lojas
    // ---

    pub async fn list_shops(
        &self,
        caller: &Caller,
        filter: ShopFilter,
        page: PageParams,
    ) -> Result<Paginated<MedicalShop>, AppError> {
        let location = caller.list_filter(
            actions::SHOPS_VIEW,
            LocationFilter {
                warehouse_id: filter.warehouse_id,
                shop_id: None,
            },
        )?;
        let (items, total) = self.repo.list_shops(&filter, location, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    pub async fn get_shop(&self, caller: &Caller, id: Uuid) -> Result<MedicalShop, AppError> {
        let shop = self.find_shop(id).await?;
        caller.authorize(actions::SHOPS_VIEW, shop_owner(&shop))?;
        Ok(shop)
    }

    pub async fn create_shop(&self, caller: &Caller, payload: CreateShopPayload) -> Result<MedicalShop, AppError> {
        let owner = match payload.warehouse_id {
            Some(id) => ResourceOwner::warehouse(id),
            None => ResourceOwner::GLOBAL,
        };
        caller.authorize(actions::SHOPS_CREATE, owner)?;

        if let Some(id) = payload.warehouse_id {
            if !self.repo.warehouse_exists(id).await? {
                return Err(AppError::NotFound("Armazém"));
            }
        }

        let shop = self.repo.create_shop(&self.pool, &payload).await?;
        tracing::info!(shop_id = %shop.id, code = %shop.code, "Loja criada");
        Ok(shop)
    }

    pub async fn update_shop(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateShopPayload,
    ) -> Result<MedicalShop, AppError> {
        let shop = self.find_shop(id).await?;
        caller.authorize(actions::SHOPS_EDIT, shop_owner(&shop))?;
        self.repo.update_shop(&self.pool, id, &payload).await
    }

    pub async fn delete_shop(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        let shop = self.find_shop(id).await?;
        caller.authorize(actions::SHOPS_DELETE, shop_owner(&shop))?;
        if self.repo.delete_shop(&self.pool, id).await? == 0 {
            return Err(AppError::NotFound("Loja"));
        }
        tracing::info!(shop_id = %id, deleted_by = %caller.user.id, "Loja excluída");
        Ok(())
    }

    async fn find_shop(&self, id: Uuid) -> Result<MedicalShop, AppError> {
        self.repo.find_shop(id).await?.ok_or(AppError::NotFound("Loja"))
    }
}

// src/services/dispatch_service.rs

use chrono::Utc;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{PageParams, Paginated},
    },
    db::{DispatchRepository, InventoryRepository, MedicineRepository, OrganizationRepository},
    models::{
        dispatch::{CreateDispatchPayload, Dispatch, DispatchDetail, DispatchFilter},
        inventory::{MovementType, NewStockMovement, StockLocation},
        rbac::actions,
    },
    services::{
        access::{Caller, LocationFilter, ResourceOwner},
        inventory_service::adjusted_quantity,
    },
};

// DSP-AAAAMMDD-XXXXXX
fn dispatch_number() -> String {
    let suffix: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("DSP-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[derive(Clone)]
pub struct DispatchService {
    dispatch_repo: DispatchRepository,
    inventory_repo: InventoryRepository,
    medicine_repo: MedicineRepository,
    org_repo: OrganizationRepository,
    pool: PgPool,
}

impl DispatchService {
    pub fn new(
        dispatch_repo: DispatchRepository,
        inventory_repo: InventoryRepository,
        medicine_repo: MedicineRepository,
        org_repo: OrganizationRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            dispatch_repo,
            inventory_repo,
            medicine_repo,
            org_repo,
            pool,
        }
    }

    /// Tira do armazém e põe na loja, item a item, numa única transação.
    pub async fn create_dispatch(
        &self,
        caller: &Caller,
        mut payload: CreateDispatchPayload,
    ) -> Result<DispatchDetail, AppError> {
        if !self.org_repo.warehouse_exists(payload.warehouse_id).await? {
            return Err(AppError::NotFound("Armazém"));
        }
        caller.authorize(actions::DISPATCHES_CREATE, ResourceOwner::warehouse(payload.warehouse_id))?;

        let shop = self
            .org_repo
            .find_shop(payload.shop_id)
            .await?
            .ok_or(AppError::NotFound("Loja"))?;
        if shop.warehouse_id != Some(payload.warehouse_id) {
            return Err(AppError::InvalidInput(
                "A loja não é abastecida pelo armazém informado.".to_string(),
            ));
        }

        // Ordem fixa de travamento entre remessas concorrentes
        payload.items.sort_by_key(|item| item.batch_id);

        let mut tx = self.pool.begin().await?;

        let dispatch = self
            .dispatch_repo
            .create_dispatch(
                &mut *tx,
                &dispatch_number(),
                payload.warehouse_id,
                shop.id,
                caller.user.id,
                payload.notes.as_deref(),
            )
            .await?;

        for item in &payload.items {
            let batch = self
                .medicine_repo
                .find_batch(&mut *tx, item.batch_id)
                .await?
                .ok_or(AppError::NotFound("Lote"))?;

            let locked = self
                .inventory_repo
                .lock_stock(&mut *tx, StockLocation::Warehouse, payload.warehouse_id, batch.id)
                .await?
                .ok_or(AppError::NotFound("Estoque"))?;
            let remaining = adjusted_quantity(locked.quantity, -item.quantity)?;

            self.inventory_repo
                .set_stock_quantity(&mut *tx, StockLocation::Warehouse, locked.id, remaining)
                .await?;
            self.inventory_repo
                .add_stock(
                    &mut *tx,
                    StockLocation::Shop,
                    shop.id,
                    batch.medicine_id,
                    batch.id,
                    item.quantity,
                )
                .await?;
            self.dispatch_repo
                .add_item(&mut *tx, dispatch.id, batch.medicine_id, batch.id, item.quantity)
                .await?;

            self.inventory_repo
                .record_movement(
                    &mut *tx,
                    &NewStockMovement {
                        movement_type: MovementType::Transfer,
                        source: Some((StockLocation::Warehouse.as_str(), Some(payload.warehouse_id))),
                        destination: Some((StockLocation::Shop.as_str(), Some(shop.id))),
                        medicine_id: batch.medicine_id,
                        batch_id: batch.id,
                        quantity: item.quantity,
                        reference_type: Some("dispatch"),
                        reference_id: Some(dispatch.id),
                        notes: payload.notes.as_deref(),
                        created_by: caller.user.id,
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            dispatch_id = %dispatch.id,
            dispatch_number = %dispatch.dispatch_number,
            warehouse_id = %dispatch.warehouse_id,
            shop_id = %dispatch.shop_id,
            items = payload.items.len(),
            "Remessa despachada"
        );

        let items = self.dispatch_repo.list_items(dispatch.id).await?;
        Ok(DispatchDetail { dispatch, items })
    }

    pub async fn get_dispatch(&self, caller: &Caller, id: Uuid) -> Result<DispatchDetail, AppError> {
        let dispatch = self
            .dispatch_repo
            .find_dispatch(id)
            .await?
            .ok_or(AppError::NotFound("Remessa"))?;
        caller.authorize(
            actions::DISPATCHES_VIEW,
            ResourceOwner::shop(dispatch.shop_id, Some(dispatch.warehouse_id)),
        )?;

        let items = self.dispatch_repo.list_items(dispatch.id).await?;
        Ok(DispatchDetail { dispatch, items })
    }

    pub async fn list_dispatches(
        &self,
        caller: &Caller,
        filter: DispatchFilter,
        page: PageParams,
    ) -> Result<Paginated<Dispatch>, AppError> {
        let location = caller.list_filter(
            actions::DISPATCHES_VIEW,
            LocationFilter {
                warehouse_id: filter.warehouse_id,
                shop_id: filter.shop_id,
            },
        )?;
        let (items, total) = self.dispatch_repo.list_dispatches(&filter, location, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_numbers_carry_the_date() {
        let number = dispatch_number();
        let today = Utc::now().format("%Y%m%d").to_string();
        assert!(number.starts_with(&format!("DSP-{}-", today)));
        assert_eq!(number.len(), "DSP-20260301-".len() + 6);
        assert_ne!(number, dispatch_number());
    }
}

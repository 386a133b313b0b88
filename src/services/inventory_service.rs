// src/services/inventory_service.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{PageParams, Paginated},
    },
    db::{InventoryRepository, MedicineRepository, OrganizationRepository},
    models::{
        inventory::{
            AdjustStockPayload, AlertFilter, MovementFilter, MovementType, NewStockMovement, StockAlert,
            StockEntryPayload, StockLevel, StockLocation, StockMovement, EXPIRY_WINDOW_DAYS,
        },
        rbac::actions,
    },
    services::access::{Caller, LocationFilter, ResourceOwner},
};

/// Quantidade após o ajuste. Estoque nunca fica negativo.
pub(crate) fn adjusted_quantity(current: i32, delta: i32) -> Result<i32, AppError> {
    match current.checked_add(delta) {
        Some(q) if q >= 0 => Ok(q),
        _ => Err(AppError::InvalidInput(format!(
            "Estoque insuficiente: disponível {}, ajuste {}.",
            current, delta
        ))),
    }
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    medicine_repo: MedicineRepository,
    org_repo: OrganizationRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(
        inventory_repo: InventoryRepository,
        medicine_repo: MedicineRepository,
        org_repo: OrganizationRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            inventory_repo,
            medicine_repo,
            org_repo,
            pool,
        }
    }

    // Dono do local (a loja carrega o armazém que a abastece). 404 se não existe.
    async fn location_owner(&self, location: StockLocation, id: Uuid) -> Result<ResourceOwner, AppError> {
        match location {
            StockLocation::Warehouse => {
                if !self.org_repo.warehouse_exists(id).await? {
                    return Err(AppError::NotFound("Armazém"));
                }
                Ok(ResourceOwner::warehouse(id))
            }
            StockLocation::Shop => {
                let shop = self.org_repo.find_shop(id).await?.ok_or(AppError::NotFound("Loja"))?;
                Ok(ResourceOwner::shop(shop.id, shop.warehouse_id))
            }
        }
    }

    pub async fn get_stock(
        &self,
        caller: &Caller,
        location: StockLocation,
        location_id: Uuid,
        page: PageParams,
    ) -> Result<Paginated<StockLevel>, AppError> {
        let owner = self.location_owner(location, location_id).await?;
        caller.authorize(actions::INVENTORY_VIEW, owner)?;

        let (items, total) = self.inventory_repo.list_stock(location, location_id, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    /// Entrada de fornecedor no armazém: soma no estoque e grava o movimento `in`.
    pub async fn stock_entry(
        &self,
        caller: &Caller,
        warehouse_id: Uuid,
        payload: StockEntryPayload,
    ) -> Result<StockLevel, AppError> {
        let owner = self.location_owner(StockLocation::Warehouse, warehouse_id).await?;
        caller.authorize(actions::INVENTORY_ENTRY, owner)?;

        let mut tx = self.pool.begin().await?;

        let batch = self
            .medicine_repo
            .find_batch(&mut *tx, payload.batch_id)
            .await?
            .ok_or(AppError::NotFound("Lote"))?;

        let level = self
            .inventory_repo
            .add_stock(
                &mut *tx,
                StockLocation::Warehouse,
                warehouse_id,
                batch.medicine_id,
                batch.id,
                payload.quantity,
            )
            .await?;

        self.inventory_repo
            .record_movement(
                &mut *tx,
                &NewStockMovement {
                    movement_type: MovementType::In,
                    source: Some(("supplier", None)),
                    destination: Some((StockLocation::Warehouse.as_str(), Some(warehouse_id))),
                    medicine_id: batch.medicine_id,
                    batch_id: batch.id,
                    quantity: payload.quantity,
                    reference_type: Some("stock_entry"),
                    reference_id: None,
                    notes: payload.notes.as_deref(),
                    created_by: caller.user.id,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            warehouse_id = %warehouse_id,
            batch_id = %batch.id,
            quantity = payload.quantity,
            "Entrada de estoque registrada"
        );
        Ok(level)
    }

    /// Ajuste manual (quebra, contagem). A linha fica travada até o commit.
    pub async fn adjust_stock(&self, caller: &Caller, payload: AdjustStockPayload) -> Result<StockLevel, AppError> {
        let owner = self.location_owner(payload.location_type, payload.location_id).await?;
        caller.authorize(actions::INVENTORY_ADJUST, owner)?;

        let mut tx = self.pool.begin().await?;

        let locked = self
            .inventory_repo
            .lock_stock(&mut *tx, payload.location_type, payload.location_id, payload.batch_id)
            .await?
            .ok_or(AppError::NotFound("Estoque"))?;

        let new_quantity = adjusted_quantity(locked.quantity, payload.delta)?;

        let level = self
            .inventory_repo
            .set_stock_quantity(&mut *tx, payload.location_type, locked.id, new_quantity)
            .await?;

        let here = Some((payload.location_type.as_str(), Some(payload.location_id)));
        let (source, destination) = if payload.delta > 0 { (None, here) } else { (here, None) };

        self.inventory_repo
            .record_movement(
                &mut *tx,
                &NewStockMovement {
                    movement_type: MovementType::Adjustment,
                    source,
                    destination,
                    medicine_id: locked.medicine_id,
                    batch_id: payload.batch_id,
                    quantity: payload.delta,
                    reference_type: Some("manual_adjustment"),
                    reference_id: None,
                    notes: Some(payload.reason.as_str()),
                    created_by: caller.user.id,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            location = payload.location_type.as_str(),
            location_id = %payload.location_id,
            delta = payload.delta,
            quantity = new_quantity,
            "Estoque ajustado"
        );
        Ok(level)
    }

    pub async fn list_movements(
        &self,
        caller: &Caller,
        filter: MovementFilter,
        page: PageParams,
    ) -> Result<Paginated<StockMovement>, AppError> {
        let location = caller.list_filter(
            actions::INVENTORY_VIEW,
            LocationFilter {
                warehouse_id: filter.warehouse_id,
                shop_id: filter.shop_id,
            },
        )?;
        let (items, total) = self.inventory_repo.list_movements(&filter, location, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    /// Estoque baixo, perto do vencimento e vencido, dentro do escopo do chamador.
    pub async fn list_alerts(&self, caller: &Caller, filter: AlertFilter) -> Result<Vec<StockAlert>, AppError> {
        let location = caller.list_filter(
            actions::INVENTORY_VIEW,
            LocationFilter {
                warehouse_id: filter.warehouse_id,
                shop_id: filter.shop_id,
            },
        )?;

        let today = Utc::now().date_naive();
        let rows = self
            .inventory_repo
            .list_alert_candidates(location, today + Duration::days(EXPIRY_WINDOW_DAYS))
            .await?;

        Ok(rows
            .iter()
            .flat_map(|row| {
                row.classify(today)
                    .into_iter()
                    .filter(|kind| filter.alert_type.is_none_or(|wanted| wanted == *kind))
                    .map(move |kind| StockAlert::new(kind, row))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_keeps_stock_non_negative() {
        assert_eq!(adjusted_quantity(10, -3).unwrap(), 7);
        assert_eq!(adjusted_quantity(10, -10).unwrap(), 0);
        assert_eq!(adjusted_quantity(0, 25).unwrap(), 25);
        assert!(matches!(adjusted_quantity(2, -3), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn adjustment_overflow_is_rejected() {
        assert!(adjusted_quantity(i32::MAX, 1).is_err());
    }
}

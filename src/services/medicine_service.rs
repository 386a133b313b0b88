// src/services/medicine_service.rs

// Catálogo global: a checagem de permissão fica no extrator da rota.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{PageParams, Paginated},
    },
    db::MedicineRepository,
    models::inventory::{
        Batch, CreateBatchPayload, CreateMedicinePayload, Medicine, MedicineFilter, UpdateMedicinePayload,
    },
};

#[derive(Clone)]
pub struct MedicineService {
    repo: MedicineRepository,
    pool: PgPool,
}

impl MedicineService {
    pub fn new(repo: MedicineRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list_medicines(
        &self,
        filter: MedicineFilter,
        page: PageParams,
    ) -> Result<Paginated<Medicine>, AppError> {
        let (items, total) = self.repo.list(&filter, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    pub async fn get_medicine(&self, id: Uuid) -> Result<Medicine, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Medicamento"))
    }

    pub async fn create_medicine(&self, payload: CreateMedicinePayload) -> Result<Medicine, AppError> {
        let medicine = self.repo.create(&self.pool, &payload).await?;
        tracing::info!(medicine_id = %medicine.id, name = %medicine.name, "Medicamento cadastrado");
        Ok(medicine)
    }

    pub async fn update_medicine(&self, id: Uuid, payload: UpdateMedicinePayload) -> Result<Medicine, AppError> {
        self.repo.update(&self.pool, id, &payload).await
    }

    pub async fn list_batches(&self, medicine_id: Uuid) -> Result<Vec<Batch>, AppError> {
        self.get_medicine(medicine_id).await?;
        self.repo.list_batches(medicine_id).await
    }

    pub async fn create_batch(&self, medicine_id: Uuid, payload: CreateBatchPayload) -> Result<Batch, AppError> {
        self.get_medicine(medicine_id).await?;
        let batch = self.repo.create_batch(&self.pool, medicine_id, &payload).await?;
        tracing::info!(batch_id = %batch.id, medicine_id = %medicine_id, "Lote cadastrado");
        Ok(batch)
    }
}

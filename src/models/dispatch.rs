// src/models/dispatch.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "dispatch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Created,
    Packed,
    Dispatched,
    InTransit,
    Delivered,
    Cancelled,
}

/// Remessa do armazém para uma loja abastecida por ele.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Dispatch {
    pub id: Uuid,
    #[schema(example = "DSP-20260301-K3Q9ZT")]
    pub dispatch_number: String,
    pub warehouse_id: Uuid,
    pub shop_id: Uuid,
    pub status: DispatchStatus,
    pub dispatched_by: Option<Uuid>,
    pub received_by: Option<Uuid>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DispatchItem {
    pub id: Uuid,
    pub dispatch_id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchDetail {
    #[serde(flatten)]
    pub dispatch: Dispatch,
    pub items: Vec<DispatchItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct DispatchItemPayload {
    pub batch_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000, message = "A quantidade deve estar entre 1 e 1.000.000."))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDispatchPayload {
    pub warehouse_id: Uuid,
    pub shop_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "A remessa precisa de ao menos um item."), nested)]
    pub items: Vec<DispatchItemPayload>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DispatchFilter {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub status: Option<DispatchStatus>,
}

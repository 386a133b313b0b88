// src/models/organization.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "warehouse_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WarehouseStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "shop_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShopStatus {
    Active,
    Inactive,
    Suspended,
}

// ---
// Armazém (centro de distribuição)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Warehouse {
    pub id: Uuid,
    #[schema(example = "Central Warehouse")]
    pub name: String,
    #[schema(example = "WH-001")]
    pub code: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub capacity: Option<i32>,
    pub status: WarehouseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Armazém + quantidade de lojas abastecidas por ele
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct WarehouseDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub warehouse: Warehouse,
    pub shop_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehousePayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub name: String,
    #[validate(length(min = 2, max = 20, message = "O código deve ter entre 2 e 20 caracteres."))]
    pub code: String,
    #[validate(length(min = 5, message = "O endereço é obrigatório."))]
    pub address: String,
    #[validate(length(min = 2, max = 50))]
    pub city: String,
    #[validate(length(min = 2, max = 50))]
    pub state: String,
    #[validate(length(min = 2, max = 50))]
    pub country: Option<String>,
    #[validate(length(min = 5, max = 10, message = "CEP/PIN inválido."))]
    pub pincode: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(range(min = 0, message = "A capacidade não pode ser negativa."))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehousePayload {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 5))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub state: Option<String>,
    #[validate(length(min = 5, max = 10))]
    pub pincode: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(range(min = 0))]
    pub capacity: Option<i32>,
    pub status: Option<WarehouseStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseFilter {
    /// Busca por nome, código ou cidade.
    pub search: Option<String>,
    pub status: Option<WarehouseStatus>,
}

// ---
// Loja (farmácia)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MedicalShop {
    pub id: Uuid,
    #[schema(example = "City Pharmacy")]
    pub name: String,
    #[schema(example = "SH-001")]
    pub code: String,
    pub shop_type: String,
    pub license_number: String,
    pub license_expiry: Option<NaiveDate>,
    pub gst_number: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
    pub phone: String,
    pub email: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub status: ShopStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShopPayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub name: String,
    #[validate(length(min = 2, max = 20, message = "O código deve ter entre 2 e 20 caracteres."))]
    pub code: String,
    #[validate(length(min = 2, max = 20))]
    pub shop_type: Option<String>,
    #[validate(length(min = 2, max = 50, message = "O número da licença é obrigatório."))]
    pub license_number: String,
    pub license_expiry: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gst_number: Option<String>,
    #[validate(length(min = 5, message = "O endereço é obrigatório."))]
    pub address: String,
    #[validate(length(min = 2, max = 50))]
    pub city: String,
    #[validate(length(min = 2, max = 50))]
    pub state: String,
    #[validate(length(min = 2, max = 50))]
    pub country: Option<String>,
    #[validate(length(min = 5, max = 10, message = "CEP/PIN inválido."))]
    pub pincode: String,
    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    pub phone: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateShopPayload {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gst_number: Option<String>,
    #[validate(length(min = 5))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub state: Option<String>,
    #[validate(length(min = 5, max = 10))]
    pub pincode: Option<String>,
    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub status: Option<ShopStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShopFilter {
    pub search: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<ShopStatus>,
}

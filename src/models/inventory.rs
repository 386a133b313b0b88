// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// Validação customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// Inteiros chegam por valor no `custom` do validator
fn validate_non_zero(val: i32) -> Result<(), ValidationError> {
    if val == 0 {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("O ajuste não pode ser zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "medicine_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MedicineType {
    Tablet,
    Capsule,
    Syrup,
    Injection,
    Cream,
    Ointment,
    Drops,
    Powder,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Transfer,
    Adjustment,
}

/// Local que guarda estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockLocation {
    Warehouse,
    Shop,
}

impl StockLocation {
    // Texto gravado em source_type/destination_type
    pub fn as_str(&self) -> &'static str {
        match self {
            StockLocation::Warehouse => "warehouse",
            StockLocation::Shop => "shop",
        }
    }
}

// ---
// Catálogo
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Medicine {
    pub id: Uuid,
    #[schema(example = "Paracetamol 500mg")]
    pub name: String,
    #[schema(example = "Paracetamol")]
    pub generic_name: String,
    pub brand: Option<String>,
    pub manufacturer: String,
    pub medicine_type: MedicineType,
    pub category: Option<String>,
    pub strength: Option<String>,
    pub unit: String,
    pub pack_size: i32,
    pub hsn_code: Option<String>,
    #[schema(value_type = f64, example = 12.0)]
    pub gst_rate: Decimal,
    #[schema(value_type = f64, example = 35.5)]
    pub mrp: Decimal,
    #[schema(value_type = f64, example = 22.0)]
    pub purchase_price: Decimal,
    pub is_prescription_required: bool,
    pub reorder_level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMedicinePayload {
    #[validate(length(min = 2, max = 200, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 2, max = 200, message = "O nome genérico é obrigatório."))]
    pub generic_name: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(min = 2, max = 200, message = "O fabricante é obrigatório."))]
    pub manufacturer: String,
    pub medicine_type: Option<MedicineType>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 50))]
    pub strength: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(range(min = 1, message = "A embalagem deve ter pelo menos 1 unidade."))]
    pub pack_size: Option<i32>,
    #[validate(length(max = 20))]
    pub hsn_code: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub gst_rate: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub mrp: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub purchase_price: Decimal,
    #[serde(default)]
    pub is_prescription_required: bool,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMedicinePayload {
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub gst_rate: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub mrp: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub purchase_price: Option<Decimal>,
    pub is_prescription_required: Option<bool>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MedicineFilter {
    /// Busca por nome, nome genérico ou marca.
    pub search: Option<String>,
    pub medicine_type: Option<MedicineType>,
    pub is_active: Option<bool>,
}

// ---
// Lotes
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Batch {
    pub id: Uuid,
    pub medicine_id: Uuid,
    #[schema(example = "B2026-001")]
    pub batch_number: String,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[schema(value_type = f64)]
    pub purchase_price: Decimal,
    #[schema(value_type = f64)]
    pub mrp: Decimal,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_batch_dates"))]
pub struct CreateBatchPayload {
    #[validate(length(min = 1, max = 50, message = "O número do lote é obrigatório."))]
    pub batch_number: String,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub purchase_price: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub mrp: Decimal,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
}

fn validate_batch_dates(payload: &CreateBatchPayload) -> Result<(), ValidationError> {
    if payload.expiry_date <= payload.manufacturing_date {
        let mut err = ValidationError::new("expiry_date");
        err.message = Some("A validade deve ser posterior à data de fabricação.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Estoque
// ---

// Linha de estoque já com os dados do medicamento e do lote
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockLevel {
    pub id: Uuid,
    /// Armazém ou loja dona da linha.
    pub location_id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub source_type: Option<String>,
    pub source_id: Option<Uuid>,
    pub destination_type: Option<String>,
    pub destination_id: Option<Uuid>,
    pub medicine_id: Uuid,
    pub batch_id: Uuid,
    /// Positivo para entrada, negativo para saída.
    pub quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Movimento a ser gravado (sempre na mesma transação da linha de estoque)
#[derive(Debug, Clone)]
pub struct NewStockMovement<'a> {
    pub movement_type: MovementType,
    pub source: Option<(&'a str, Option<Uuid>)>,
    pub destination: Option<(&'a str, Option<Uuid>)>,
    pub medicine_id: Uuid,
    pub batch_id: Uuid,
    pub quantity: i32,
    pub reference_type: Option<&'a str>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<&'a str>,
    pub created_by: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockEntryPayload {
    pub batch_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000, message = "A quantidade deve estar entre 1 e 1.000.000."))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockPayload {
    pub location_type: StockLocation,
    pub location_id: Uuid,
    pub batch_id: Uuid,
    /// Variação com sinal (ex.: -3 para quebra).
    #[validate(custom(function = "validate_non_zero"))]
    pub delta: i32,
    #[validate(length(min = 3, max = 500, message = "Informe o motivo do ajuste."))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub medicine_id: Option<Uuid>,
}

// ---
// Alertas
// ---

/// Dias à frente considerados "perto do vencimento".
pub const EXPIRY_WINDOW_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    Expiring,
    Expired,
}

// Linha com saldo positivo candidata a alerta
#[derive(Debug, Clone, FromRow)]
pub struct AlertCandidate {
    pub location_type: String,
    pub location_id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i32,
    pub reorder_level: i32,
}

impl AlertCandidate {
    /// Alertas que a linha dispara em `today`. Lote vencido não conta como estoque baixo.
    pub fn classify(&self, today: NaiveDate) -> Vec<AlertType> {
        if self.quantity <= 0 {
            return Vec::new();
        }
        if self.expiry_date < today {
            return vec![AlertType::Expired];
        }

        let mut alerts = Vec::new();
        if self.quantity <= self.reorder_level {
            alerts.push(AlertType::LowStock);
        }
        if self.expiry_date <= today + chrono::Duration::days(EXPIRY_WINDOW_DAYS) {
            alerts.push(AlertType::Expiring);
        }
        alerts
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAlert {
    pub alert_type: AlertType,
    #[schema(example = "warehouse")]
    pub location_type: String,
    pub location_id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i32,
    pub reorder_level: i32,
}

impl StockAlert {
    pub fn new(alert_type: AlertType, row: &AlertCandidate) -> Self {
        Self {
            alert_type,
            location_type: row.location_type.clone(),
            location_id: row.location_id,
            medicine_id: row.medicine_id,
            medicine_name: row.medicine_name.clone(),
            batch_id: row.batch_id,
            batch_number: row.batch_number.clone(),
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            reorder_level: row.reorder_level,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertFilter {
    /// Sem filtro, retorna os três tipos.
    pub alert_type: Option<AlertType>,
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_expiry_must_follow_manufacturing() {
        let mut payload = CreateBatchPayload {
            batch_number: "B1".into(),
            manufacturing_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            purchase_price: Decimal::new(1000, 2),
            mrp: Decimal::new(1500, 2),
            supplier: None,
        };
        assert!(payload.validate().is_err());

        payload.expiry_date = NaiveDate::from_ymd_opt(2028, 1, 10).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let payload = AdjustStockPayload {
            location_type: StockLocation::Warehouse,
            location_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            delta: 0,
            reason: "contagem".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("delta"));
    }

    #[test]
    fn empty_stock_entry_is_rejected() {
        let payload = StockEntryPayload {
            batch_id: Uuid::new_v4(),
            quantity: 0,
            notes: None,
        };
        assert!(payload.validate().is_err());
    }

    fn candidate(quantity: i32, reorder_level: i32, expiry: NaiveDate) -> AlertCandidate {
        AlertCandidate {
            location_type: "warehouse".into(),
            location_id: Uuid::new_v4(),
            medicine_id: Uuid::new_v4(),
            medicine_name: "Paracetamol 500mg".into(),
            batch_id: Uuid::new_v4(),
            batch_number: "B1".into(),
            expiry_date: expiry,
            quantity,
            reorder_level,
        }
    }

    #[test]
    fn alerts_follow_quantity_and_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let far = NaiveDate::from_ymd_opt(2027, 3, 1).unwrap();

        assert!(candidate(100, 50, far).classify(today).is_empty());
        assert_eq!(candidate(50, 50, far).classify(today), vec![AlertType::LowStock]);
        assert_eq!(
            candidate(10, 50, today + chrono::Duration::days(60)).classify(today),
            vec![AlertType::LowStock, AlertType::Expiring]
        );
        assert!(candidate(100, 50, today + chrono::Duration::days(61))
            .classify(today)
            .is_empty());
        assert_eq!(candidate(100, 50, today).classify(today), vec![AlertType::Expiring]);
    }

    #[test]
    fn expired_batches_only_raise_expired() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();

        assert_eq!(candidate(5, 50, yesterday).classify(today), vec![AlertType::Expired]);
        assert!(candidate(0, 50, yesterday).classify(today).is_empty());
    }

    #[test]
    fn stock_entry_has_an_upper_bound() {
        let payload = StockEntryPayload {
            batch_id: Uuid::new_v4(),
            quantity: 1_000_001,
            notes: None,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("quantity"));
    }
}

// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::request_password_reset,
        handlers::auth::confirm_password_reset,
        handlers::auth::logout,
        handlers::auth::get_me,

        // --- RBAC ---
        handlers::rbac::list_permissions,
        handlers::rbac::list_roles,
        handlers::rbac::get_role,
        handlers::rbac::create_role,
        handlers::rbac::update_role,
        handlers::rbac::delete_role,
        handlers::rbac::grant_permission,
        handlers::rbac::revoke_permission,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::deactivate_user,

        // --- Warehouses ---
        handlers::warehouses::list_warehouses,
        handlers::warehouses::get_warehouse,
        handlers::warehouses::create_warehouse,
        handlers::warehouses::update_warehouse,
        handlers::warehouses::delete_warehouse,
        handlers::warehouses::list_warehouse_shops,

        // --- Shops ---
        handlers::shops::list_shops,
        handlers::shops::get_shop,
        handlers::shops::create_shop,
        handlers::shops::update_shop,
        handlers::shops::delete_shop,

        // --- Medicines ---
        handlers::medicines::list_medicines,
        handlers::medicines::get_medicine,
        handlers::medicines::create_medicine,
        handlers::medicines::update_medicine,
        handlers::medicines::list_batches,
        handlers::medicines::create_batch,

        // --- INVENTORY ---
        handlers::inventory::get_warehouse_stock,
        handlers::inventory::get_shop_stock,
        handlers::inventory::stock_entry,
        handlers::inventory::adjust_stock,
        handlers::inventory::list_movements,
        handlers::inventory::list_alerts,

        // --- Dispatches ---
        handlers::dispatches::list_dispatches,
        handlers::dispatches::get_dispatch,
        handlers::dispatches::create_dispatch,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::RefreshTokenPayload,
            models::auth::TokenResponse,
            models::auth::PasswordResetRequestPayload,
            models::auth::PasswordResetConfirmPayload,
            models::auth::PasswordResetRequested,
            models::auth::MeResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,

            // --- RBAC ---
            models::rbac::PermissionScope,
            models::rbac::RoleEntityType,
            models::rbac::LegacyRole,
            models::rbac::Permission,
            models::rbac::Role,
            models::rbac::RoleResponse,
            models::rbac::CreateRolePayload,
            models::rbac::UpdateRolePayload,

            // --- Organization ---
            models::organization::WarehouseStatus,
            models::organization::ShopStatus,
            models::organization::Warehouse,
            models::organization::WarehouseDetail,
            models::organization::CreateWarehousePayload,
            models::organization::UpdateWarehousePayload,
            models::organization::MedicalShop,
            models::organization::CreateShopPayload,
            models::organization::UpdateShopPayload,

            // --- Inventory ---
            models::inventory::MedicineType,
            models::inventory::MovementType,
            models::inventory::StockLocation,
            models::inventory::Medicine,
            models::inventory::CreateMedicinePayload,
            models::inventory::UpdateMedicinePayload,
            models::inventory::Batch,
            models::inventory::CreateBatchPayload,
            models::inventory::StockLevel,
            models::inventory::StockMovement,
            models::inventory::StockEntryPayload,
            models::inventory::AdjustStockPayload,
            models::inventory::AlertType,
            models::inventory::StockAlert,

            // --- Dispatches ---
            models::dispatch::DispatchStatus,
            models::dispatch::Dispatch,
            models::dispatch::DispatchItem,
            models::dispatch::DispatchDetail,
            models::dispatch::DispatchItemPayload,
            models::dispatch::CreateDispatchPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login, tokens e perfil"),
        (name = "RBAC", description = "Controle de Acesso (Cargos e Permissões)"),
        (name = "Users", description = "Administração de usuários"),
        (name = "Warehouses", description = "Armazéns (centros de distribuição)"),
        (name = "Shops", description = "Farmácias da rede"),
        (name = "Medicines", description = "Catálogo de medicamentos e lotes"),
        (name = "Inventory", description = "Estoque, alertas e livro de movimentações"),
        (name = "Dispatches", description = "Remessas do armazém para as lojas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

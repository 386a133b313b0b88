pub mod access;
pub mod auth;
pub use auth::AuthService;
pub mod rbac_service;
pub use rbac_service::RbacService;
pub mod registry;
pub mod user_service;
pub use user_service::UserService;
pub mod organization_service;
pub use organization_service::OrganizationService;
pub mod medicine_service;
pub use medicine_service::MedicineService;
pub mod inventory_service;
pub use inventory_service::InventoryService;
pub mod dispatch_service;
pub use dispatch_service::DispatchService;

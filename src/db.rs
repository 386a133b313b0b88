pub mod user_repo;
pub use user_repo::UserRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod organization_repo;
pub use organization_repo::OrganizationRepository;
pub mod medicine_repo;
pub use medicine_repo::MedicineRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod dispatch_repo;
pub use dispatch_repo::DispatchRepository;

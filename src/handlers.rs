pub mod auth;
pub mod dispatches;
pub mod inventory;
pub mod medicines;
pub mod rbac;
pub mod shops;
pub mod users;
pub mod warehouses;

pub mod auth;
pub mod dispatch;
pub mod inventory;
pub mod organization;
pub mod rbac;

//! Operator client for looking up accounts and editing character inventories
//! against the account/inventory HTTP service.

pub mod api;
pub mod app;
pub mod config;
pub mod form;
pub mod ui;

pub use api::{ApiClient, ApiError, InventoryService};
pub use config::ClientConfig;
pub use form::InventoryForm;

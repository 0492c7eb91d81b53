//! # ShopForge Registry
//!
//! Durable record of store lifecycle state plus the append-only audit log,
//! backed by a single-file SQLite database in WAL mode. The control plane
//! is the only writer; reads are concurrent.

pub mod audit;
pub mod migration;
pub mod models;
pub mod store;

mod database;

pub use audit::AuditLog;
pub use database::Database;
pub use models::{
    generate_store_id, AuditAction, AuditEntry, NewStore, ProvisioningStats, Store, StoreStatus,
};
pub use store::StoreRegistry;

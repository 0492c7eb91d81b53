//! # ShopForge Server
//!
//! Thin REST layer over the registry and provisioner. Every mutating
//! endpoint validates input, enforces the state-machine guard, mutates the
//! registry, schedules the background operation, and returns immediately.

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

//! Application state shared across all requests.

use shopforge_core::config::AppConfig;
use shopforge_core::error::Error;
use shopforge_engines::EngineRegistry;
use shopforge_provisioner::Provisioner;
use shopforge_registry::StoreRegistry;
use std::sync::Arc;

use crate::error::HttpError;
use crate::middleware::RateLimiter;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Durable store registry (and its audit log)
    pub registry: StoreRegistry,
    /// Engine strategies, resolved at startup
    pub engines: Arc<EngineRegistry>,
    /// Lifecycle workflow engine
    pub provisioner: Arc<Provisioner>,
    /// Per-client request counters
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        registry: StoreRegistry,
        engines: Arc<EngineRegistry>,
        provisioner: Arc<Provisioner>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config,
            registry,
            engines,
            provisioner,
            rate_limiter,
        }
    }

    /// Map a core error to the wire envelope under this deployment's
    /// production setting
    pub fn fail(&self, err: Error) -> HttpError {
        HttpError::from_error(err, self.config.is_production())
    }
}

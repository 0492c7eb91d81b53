//! # ShopForge Engines
//!
//! An engine describes how to parameterize the deployment chart for one
//! e-commerce stack: which chart to install, the values it needs for a
//! given store identity, and the URLs the store ends up served on.
//! Engines are resolved once at startup through [`EngineRegistry`].

pub mod medusa;
pub mod secrets;
pub mod woocommerce;

use serde::{Deserialize, Serialize};
use shopforge_core::config::StoresConfig;
use shopforge_core::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use medusa::MedusaEngine;
pub use woocommerce::WooCommerceEngine;

/// Engine tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    WooCommerce,
    Medusa,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::WooCommerce => "woocommerce",
            EngineKind::Medusa => "medusa",
        }
    }

    /// Parse an engine tag; unknown tags are an operational error
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "woocommerce" => Ok(EngineKind::WooCommerce),
            "medusa" => Ok(EngineKind::Medusa),
            other => Err(Error::InvalidEngine {
                engine: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for EngineKind {
    fn default() -> Self {
        EngineKind::WooCommerce
    }
}

/// URLs a provisioned store is reachable on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineUrls {
    pub store_url: String,
    pub admin_url: String,
}

/// Outcome of an engine availability check
#[derive(Debug, Clone)]
pub struct EngineValidation {
    pub valid: bool,
    pub error: Option<String>,
}

impl EngineValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// Capability set every engine provides
pub trait Engine: Send + Sync {
    /// Engine tag
    fn name(&self) -> EngineKind;

    /// Chart installed for each store of this engine
    fn chart_path(&self) -> &Path;

    /// Chart values for one store identity. Secrets are freshly generated
    /// on every call, so retries produce new credentials.
    fn values(&self, store_id: &str) -> BTreeMap<String, String>;

    /// Store and admin URLs for one store identity
    fn urls(&self, store_id: &str) -> EngineUrls;

    /// Availability check, surfaced at the API boundary as
    /// ENGINE_UNAVAILABLE when not valid
    fn validate(&self) -> EngineValidation;
}

/// Map from engine tag to implementation, resolved once at startup
pub struct EngineRegistry {
    engines: HashMap<EngineKind, Arc<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new(config: &StoresConfig, chart_path: &Path) -> Self {
        let mut engines: HashMap<EngineKind, Arc<dyn Engine>> = HashMap::new();
        engines.insert(
            EngineKind::WooCommerce,
            Arc::new(WooCommerceEngine::new(config.clone(), chart_path.to_path_buf())),
        );
        engines.insert(EngineKind::Medusa, Arc::new(MedusaEngine::new()));
        Self { engines }
    }

    pub fn resolve(&self, kind: EngineKind) -> Result<Arc<dyn Engine>> {
        self.engines.get(&kind).cloned().ok_or(Error::InvalidEngine {
            engine: kind.to_string(),
        })
    }

    /// Parse and resolve an engine tag in one step
    pub fn resolve_tag(&self, tag: &str) -> Result<Arc<dyn Engine>> {
        self.resolve(EngineKind::parse(tag)?)
    }
}

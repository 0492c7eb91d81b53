//! Medusa engine placeholder.
//!
//! The Medusa chart has not shipped; the engine is registered so the tag
//! parses, and `validate` reports it unavailable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{Engine, EngineKind, EngineUrls, EngineValidation};

pub struct MedusaEngine {
    chart_path: PathBuf,
}

impl MedusaEngine {
    pub fn new() -> Self {
        Self {
            chart_path: PathBuf::from("./charts/medusa"),
        }
    }
}

impl Default for MedusaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MedusaEngine {
    fn name(&self) -> EngineKind {
        EngineKind::Medusa
    }

    fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    fn values(&self, _store_id: &str) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn urls(&self, store_id: &str) -> EngineUrls {
        let store_url = format!("http://{store_id}.invalid");
        EngineUrls {
            admin_url: format!("{store_url}/admin"),
            store_url,
        }
    }

    fn validate(&self) -> EngineValidation {
        EngineValidation::unavailable("Medusa engine is not yet supported")
    }
}

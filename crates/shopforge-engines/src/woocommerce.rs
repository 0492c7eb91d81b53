//! WordPress + WooCommerce engine.

use shopforge_core::config::StoresConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::secrets::{generate_password, ADMIN_PASSWORD_LEN, MYSQL_PASSWORD_LEN};
use crate::{Engine, EngineKind, EngineUrls, EngineValidation};

const MYSQL_DATABASE: &str = "wordpress";
const MYSQL_USER: &str = "wordpress";
const INGRESS_CLASS: &str = "nginx";

/// Parameterizes the WordPress/WooCommerce chart for one store
pub struct WooCommerceEngine {
    config: StoresConfig,
    chart_path: PathBuf,
}

impl WooCommerceEngine {
    pub fn new(config: StoresConfig, chart_path: PathBuf) -> Self {
        Self { config, chart_path }
    }

    fn domain(&self, store_id: &str) -> String {
        format!("{store_id}.{}", self.config.base_domain)
    }
}

impl Engine for WooCommerceEngine {
    fn name(&self) -> EngineKind {
        EngineKind::WooCommerce
    }

    fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    fn values(&self, store_id: &str) -> BTreeMap<String, String> {
        let domain = self.domain(store_id);

        let mut values = BTreeMap::new();
        values.insert("storeId".to_string(), store_id.to_string());
        values.insert("domain".to_string(), domain.clone());

        values.insert(
            "mysql.rootPassword".to_string(),
            generate_password(MYSQL_PASSWORD_LEN),
        );
        values.insert("mysql.database".to_string(), MYSQL_DATABASE.to_string());
        values.insert("mysql.user".to_string(), MYSQL_USER.to_string());
        values.insert(
            "mysql.password".to_string(),
            generate_password(MYSQL_PASSWORD_LEN),
        );

        values.insert(
            "wordpress.adminUser".to_string(),
            self.config.wp_admin_user.clone(),
        );
        values.insert(
            "wordpress.adminEmail".to_string(),
            self.config.wp_admin_email.clone(),
        );
        values.insert(
            "wordpress.adminPassword".to_string(),
            generate_password(ADMIN_PASSWORD_LEN),
        );
        values.insert("wordpress.siteTitle".to_string(), store_id.to_string());

        values.insert("ingress.host".to_string(), domain);
        values.insert("ingress.className".to_string(), INGRESS_CLASS.to_string());

        values
    }

    fn urls(&self, store_id: &str) -> EngineUrls {
        let store_url = format!("http://{}", self.domain(store_id));
        let admin_url = format!("{store_url}/wp-admin");
        EngineUrls {
            store_url,
            admin_url,
        }
    }

    fn validate(&self) -> EngineValidation {
        EngineValidation::ok()
    }
}

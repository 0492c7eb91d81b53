//! Configuration for the ShopForge control plane.
//!
//! Defaults suit local development against a nip.io wildcard; every knob is
//! overridable through environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const NODE_ENV: &str = "NODE_ENV";
    pub const DB_PATH: &str = "DB_PATH";
    pub const HELM_CHART_PATH: &str = "HELM_CHART_PATH";
    pub const KUBECONFIG: &str = "KUBECONFIG";
    pub const BASE_DOMAIN: &str = "BASE_DOMAIN";
    pub const MAX_STORES: &str = "MAX_STORES";
    pub const PROVISION_TIMEOUT_MS: &str = "PROVISION_TIMEOUT_MS";
    pub const RATE_LIMIT_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
    pub const RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
    pub const RATE_LIMIT_MAX_CREATES: &str = "RATE_LIMIT_MAX_CREATES";
    pub const WP_ADMIN_USER: &str = "WP_ADMIN_USER";
    pub const WP_ADMIN_EMAIL: &str = "WP_ADMIN_EMAIL";
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Cluster tooling configuration
    pub cluster: ClusterConfig,
    /// Provisioning workflow configuration
    pub provisioner: ProvisionerConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Store platform configuration
    pub stores: StoresConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cluster: ClusterConfig::default(),
            provisioner: ProvisionerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            stores: StoresConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Self {
        let mut config = AppConfig::default();

        if let Some(port) = parse_var(env_vars::PORT) {
            config.server.port = port;
        }
        if let Ok(environment) = env::var(env_vars::NODE_ENV) {
            config.server.environment = environment;
        }
        if let Ok(path) = env::var(env_vars::DB_PATH) {
            config.database.path = PathBuf::from(path);
        }
        if let Ok(path) = env::var(env_vars::HELM_CHART_PATH) {
            config.cluster.helm_chart_path = PathBuf::from(path);
        }
        if let Ok(kubeconfig) = env::var(env_vars::KUBECONFIG) {
            // Empty means in-cluster credentials
            config.cluster.kubeconfig = if kubeconfig.is_empty() {
                None
            } else {
                Some(PathBuf::from(kubeconfig))
            };
        }
        if let Ok(domain) = env::var(env_vars::BASE_DOMAIN) {
            config.stores.base_domain = domain;
        }
        if let Some(max) = parse_var(env_vars::MAX_STORES) {
            config.stores.max_stores = max;
        }
        if let Some(ms) = parse_var(env_vars::PROVISION_TIMEOUT_MS) {
            config.provisioner.timeout_ms = ms;
        }
        if let Some(ms) = parse_var(env_vars::RATE_LIMIT_WINDOW_MS) {
            config.rate_limit.window_ms = ms;
        }
        if let Some(max) = parse_var(env_vars::RATE_LIMIT_MAX_REQUESTS) {
            config.rate_limit.max_requests = max;
        }
        if let Some(max) = parse_var(env_vars::RATE_LIMIT_MAX_CREATES) {
            config.rate_limit.max_creates = max;
        }
        if let Ok(user) = env::var(env_vars::WP_ADMIN_USER) {
            config.stores.wp_admin_user = user;
        }
        if let Ok(email) = env::var(env_vars::WP_ADMIN_EMAIL) {
            config.stores.wp_admin_email = email;
        }

        config
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment name (development, production, ...)
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/shopforge.db"),
        }
    }
}

/// Cluster tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Path to the chart installed for each store
    pub helm_chart_path: PathBuf,
    /// Kubeconfig path; None means in-cluster credentials
    pub kubeconfig: Option<PathBuf>,
    /// Timeout for helm invocations in seconds
    pub helm_timeout_secs: u64,
    /// Timeout for kubectl invocations in seconds
    pub kubectl_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            helm_chart_path: PathBuf::from("./charts/woocommerce"),
            kubeconfig: None,
            helm_timeout_secs: 600,
            kubectl_timeout_secs: 30,
        }
    }
}

impl ClusterConfig {
    pub fn helm_timeout(&self) -> Duration {
        Duration::from_secs(self.helm_timeout_secs)
    }

    pub fn kubectl_timeout(&self) -> Duration {
        Duration::from_secs(self.kubectl_timeout_secs)
    }
}

/// Provisioning workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Overall deadline for one provision workflow in milliseconds
    pub timeout_ms: u64,
    /// Maximum readiness poll attempts
    pub poll_max_attempts: u32,
    /// Delay between readiness polls in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 600_000,
            poll_max_attempts: 60,
            poll_interval_ms: 5_000,
        }
    }
}

impl ProvisionerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Fixed window size in milliseconds
    pub window_ms: u64,
    /// Maximum requests per window per client
    pub max_requests: u32,
    /// Maximum store creations per window per client
    pub max_creates: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 30,
            max_creates: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Store platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    /// Wildcard domain stores are exposed under
    pub base_domain: String,
    /// Maximum number of active stores
    pub max_stores: u32,
    /// WordPress admin account name for new stores
    pub wp_admin_user: String,
    /// WordPress admin account email for new stores
    pub wp_admin_email: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            base_domain: "127.0.0.1.nip.io".to_string(),
            max_stores: 10,
            wp_admin_user: "admin".to_string(),
            wp_admin_email: "admin@example.com".to_string(),
        }
    }
}

// src/config/models.rs
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

fn default_health_paths() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_cli() -> String {
    "railway".to_string()
}

fn default_postgres_fallback() -> String {
    "Postgres".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// One deployed unit to health-check.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Base URL the health paths are appended to.
    pub url: String,
    #[serde(default = "default_health_paths")]
    pub health_paths: Vec<String>,
    /// Variables that must be present and non-empty after resolution.
    #[serde(default)]
    pub required_env: Vec<String>,
    /// Which resolved variable holds the database connection string.
    /// The database check only runs when this is set.
    #[serde(default)]
    pub db_url_key: Option<String>,
    /// Name the deployment platform knows this service by. Variable
    /// fetching is skipped when absent.
    #[serde(default)]
    pub platform_service: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Platform CLI binary invoked for variable listing and tunneling.
    #[serde(default = "default_cli")]
    pub cli: String,
    /// Service identifier used for the tunneled connectivity fallback and
    /// when an indirect Postgres reference cannot be fetched directly.
    #[serde(default = "default_postgres_fallback")]
    pub postgres_fallback_service: String,
    /// Last-resort connection string substituted when indirect resolution
    /// yields nothing usable. Off by default.
    #[serde(default)]
    pub fallback_database_url: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            cli: default_cli(),
            postgres_fallback_service: default_postgres_fallback(),
            fallback_database_url: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            bail!("no services configured");
        }
        for service in &self.services {
            if service.name.trim().is_empty() {
                bail!("service with empty name in configuration");
            }
            Url::parse(&service.url)
                .with_context(|| format!("invalid base url for service '{}'", service.name))?;
        }
        Ok(())
    }
}

// src/checker/mod.rs
mod dburl;
mod env;
mod http;

pub use dburl::{normalize_db_url, resolve_indirect};
pub use env::{ambient_overrides, check_required, resolve_env, EnvRequired, ResolvedEnv};
pub use http::{probe_http, HttpCheck};

use crate::config::{PlatformConfig, ServiceConfig};
use crate::platform::VariableFetcher;
use crate::probe::ConnectivityProber;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct DbCheck {
    pub key: String,
    pub ok: bool,
    pub msg: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerdictDetails {
    pub http: HttpCheck,
    pub env_required: EnvRequired,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DbCheck>,
}

/// One service's aggregated outcome. `ok` holds exactly when every
/// sub-check it includes passed.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceVerdict {
    pub service: String,
    pub ok: bool,
    pub details: VerdictDetails,
}

pub struct ServiceChecker {
    fetcher: VariableFetcher,
    prober: ConnectivityProber,
    platform: PlatformConfig,
    overrides: HashMap<String, String>,
    client: Client,
}

impl ServiceChecker {
    pub fn new(
        fetcher: VariableFetcher,
        prober: ConnectivityProber,
        platform: PlatformConfig,
        overrides: HashMap<String, String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(http::HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            fetcher,
            prober,
            platform,
            overrides,
            client,
        }
    }

    /// Run every sub-check for one service. The sub-checks are independent:
    /// an early failure never skips a later check, and nothing here fails
    /// structurally — bad outcomes land in the verdict.
    pub async fn check(&self, cfg: &ServiceConfig) -> ServiceVerdict {
        info!(service = %cfg.name, "checking service");

        let http = probe_http(&self.client, &cfg.url, &cfg.health_paths).await;
        if !http.ok {
            warn!(
                service = %cfg.name,
                status = ?http.status,
                error = ?http.error,
                "http check failed"
            );
        }

        let env = resolve_env(&self.fetcher, cfg, &self.overrides).await;
        let env_required = check_required(&env, &cfg.required_env);
        let platform_error = env.fetch_error.clone();
        if let Some(err) = &platform_error {
            warn!(service = %cfg.name, %err, "platform variable fetch failed");
        }

        let database = match &cfg.db_url_key {
            Some(key) => Some(self.check_database(key, &env).await),
            None => None,
        };

        let mut ok = http.ok && env_required.ok && platform_error.is_none();
        if let Some(db) = &database {
            ok &= db.ok;
        }

        ServiceVerdict {
            service: cfg.name.clone(),
            ok,
            details: VerdictDetails {
                http,
                env_required,
                platform_error,
                database,
            },
        }
    }

    async fn check_database(&self, key: &str, env: &ResolvedEnv) -> DbCheck {
        let raw = env.vars.get(key).cloned().unwrap_or_default();
        let resolved = resolve_indirect(&raw, &self.fetcher, &self.platform).await;
        let db_url = normalize_db_url(&resolved);

        if db_url.is_empty() {
            return DbCheck {
                key: key.to_string(),
                ok: false,
                msg: format!("variable {key} missing or empty"),
            };
        }

        let result = self.prober.check(&db_url).await;
        DbCheck {
            key: key.to_string(),
            ok: result.ok,
            msg: result.message,
        }
    }
}

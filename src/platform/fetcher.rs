// src/platform/fetcher.rs
use crate::config::PlatformConfig;
use crate::platform::command::{CommandRunner, CommandError};
use crate::platform::table::parse_table;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to list variables for '{service}': {detail}")]
    Command { service: String, detail: String },

    #[error("no variables found for '{service}'")]
    NoVariables { service: String },
}

#[derive(Debug, Deserialize)]
struct VarRecord {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

/// Lists a service's environment variables through the platform CLI.
pub struct VariableFetcher {
    runner: Arc<dyn CommandRunner>,
    cli: String,
}

impl VariableFetcher {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: &PlatformConfig) -> Self {
        Self {
            runner,
            cli: platform.cli.clone(),
        }
    }

    /// Two modes tried in order: structured JSON output first, the default
    /// table rendering as the fallback.
    pub async fn fetch(&self, service: &str) -> Result<HashMap<String, String>, FetchError> {
        if let Some(vars) = self.fetch_json(service).await {
            return Ok(vars);
        }
        self.fetch_table(service).await
    }

    async fn fetch_json(&self, service: &str) -> Option<HashMap<String, String>> {
        let out = self
            .runner
            .run(
                &self.cli,
                &["variables", "--service", service, "--json"],
                None,
                FETCH_TIMEOUT,
            )
            .await
            .ok()?;
        if !out.success || out.stdout.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<Vec<VarRecord>>(&out.stdout) {
            Ok(records) => Some(
                records
                    .into_iter()
                    .filter(|r| !r.key.is_empty())
                    .map(|r| (r.key, r.value))
                    .collect(),
            ),
            Err(err) => {
                debug!(%service, %err, "structured variable output did not parse, falling back to table mode");
                None
            }
        }
    }

    async fn fetch_table(&self, service: &str) -> Result<HashMap<String, String>, FetchError> {
        let out = self
            .runner
            .run(&self.cli, &["variables", "--service", service], None, FETCH_TIMEOUT)
            .await
            .map_err(|err: CommandError| FetchError::Command {
                service: service.to_string(),
                detail: err.to_string(),
            })?;
        if !out.success {
            return Err(FetchError::Command {
                service: service.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }

        let vars = parse_table(&out.stdout);
        if vars.is_empty() {
            return Err(FetchError::NoVariables {
                service: service.to_string(),
            });
        }
        Ok(vars)
    }
}

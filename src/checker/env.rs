// src/checker/env.rs
use crate::config::ServiceConfig;
use crate::platform::VariableFetcher;
use serde::Serialize;
use std::collections::HashMap;

/// Variables resolved for one service: platform values overlaid with the
/// injected override map. A platform fetch failure rides alongside the map
/// instead of unwinding the check.
#[derive(Debug, Default)]
pub struct ResolvedEnv {
    pub vars: HashMap<String, String>,
    pub fetch_error: Option<String>,
}

/// Capture every fully-uppercase-named variable from the process
/// environment. Called once at startup; the checker only ever sees the
/// returned map.
pub fn ambient_overrides() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| {
            name.chars().any(|c| c.is_ascii_uppercase())
                && !name.chars().any(|c| c.is_ascii_lowercase())
        })
        .collect()
}

pub async fn resolve_env(
    fetcher: &VariableFetcher,
    cfg: &ServiceConfig,
    overrides: &HashMap<String, String>,
) -> ResolvedEnv {
    let mut env = ResolvedEnv::default();

    if let Some(service) = &cfg.platform_service {
        match fetcher.fetch(service).await {
            Ok(vars) => env.vars = vars,
            Err(err) => env.fetch_error = Some(err.to_string()),
        }
    }

    // Overrides win over platform values.
    for (name, value) in overrides {
        env.vars.insert(name.clone(), value.clone());
    }

    env
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvRequired {
    pub count: usize,
    pub missing: Vec<String>,
    pub ok: bool,
}

/// Every required name must be present and non-empty.
pub fn check_required(env: &ResolvedEnv, required: &[String]) -> EnvRequired {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| env.vars.get(*name).map_or(true, |v| v.is_empty()))
        .cloned()
        .collect();

    EnvRequired {
        count: required.len(),
        ok: missing.is_empty(),
        missing,
    }
}

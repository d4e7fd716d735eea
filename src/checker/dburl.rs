// src/checker/dburl.rs
use crate::config::PlatformConfig;
use crate::platform::VariableFetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static INDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([^}]+)\.([A-Z0-9_]+)\}$").unwrap());

// A usable connection string has something between "://" and the first
// path, query or credential separator.
static HOST_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"://[^/?@]+").unwrap());

const URL_FALLBACK_KEYS: [&str; 5] = [
    "DATABASE_PUBLIC_URL",
    "DATABASE_URL",
    "DATABASE_URL_POOLED",
    "POSTGRES_URL",
    "PG_DATABASE_URL",
];

fn looks_incomplete(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed == "postgresql://" || trimmed == "postgres://" {
        return true;
    }
    !HOST_SEGMENT.is_match(trimmed)
}

/// Expand a `${Service.VAR}` platform reference into the referenced value.
///
/// When the named variable comes back incomplete, a fixed list of common
/// connection-string keys in the referenced service's map is probed before
/// giving up; anything that is not a placeholder passes through untouched.
pub async fn resolve_indirect(
    value: &str,
    fetcher: &VariableFetcher,
    platform: &PlatformConfig,
) -> String {
    let Some(caps) = INDIRECT.captures(value) else {
        return value.to_string();
    };
    let service_ref = &caps[1];
    let var = &caps[2];

    let vars = match fetcher.fetch(service_ref).await {
        Ok(vars) => vars,
        Err(err) if service_ref.to_ascii_lowercase().starts_with("postgres") => {
            debug!(%service_ref, %err, "reference fetch failed, trying the fallback postgres service");
            match fetcher.fetch(&platform.postgres_fallback_service).await {
                Ok(vars) => vars,
                Err(_) => return value.to_string(),
            }
        }
        Err(_) => return value.to_string(),
    };

    let mut candidate = vars.get(var).cloned().unwrap_or_default();
    if looks_incomplete(&candidate) {
        if let Some(found) = URL_FALLBACK_KEYS
            .iter()
            .filter_map(|key| vars.get(*key))
            .find(|url| !looks_incomplete(url))
        {
            candidate = found.clone();
        }
    }
    if looks_incomplete(&candidate) {
        if let Some(last_resort) = &platform.fallback_database_url {
            candidate = last_resort.clone();
        }
    }

    if candidate.is_empty() {
        value.to_string()
    } else {
        candidate
    }
}

/// Canonicalize a Postgres connection string and force encrypted transport.
///
/// Prefixed forms pass through; a bare value that starts with "postgres"
/// and has no scheme separator is rewritten to `postgresql://`, and
/// `sslmode=require` is appended unless an sslmode is already set.
pub fn normalize_db_url(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut url = input.to_string();
    if url.starts_with("postgres://")
        || url.starts_with("postgresql://")
        || url.starts_with("postgresql:")
    {
        // already carries a scheme
    } else if !url.contains("://") && url.starts_with("postgres") {
        let rest = url["postgres".len()..].trim_start_matches([':', '/']);
        url = format!("postgresql://{rest}");
    }

    if !url.contains("sslmode=") {
        let sep = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{sep}sslmode=require");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::ScriptedRunner;
    use std::sync::Arc;

    fn fetcher(runner: Arc<ScriptedRunner>) -> VariableFetcher {
        VariableFetcher::new(runner, &PlatformConfig::default())
    }

    #[test]
    fn bare_postgres_value_is_rewritten_with_sslmode() {
        let url = normalize_db_url("postgres:abc");
        assert!(url.starts_with("postgresql://abc"));
        assert!(url.ends_with("sslmode=require"));
    }

    #[test]
    fn prefixed_urls_only_gain_sslmode() {
        assert_eq!(
            normalize_db_url("postgresql://u:p@host:5432/db"),
            "postgresql://u:p@host:5432/db?sslmode=require"
        );
        assert_eq!(
            normalize_db_url("postgres://host/db?application_name=doctor"),
            "postgres://host/db?application_name=doctor&sslmode=require"
        );
    }

    #[test]
    fn existing_sslmode_is_left_alone() {
        let url = "postgresql://host/db?sslmode=disable";
        assert_eq!(normalize_db_url(url), url);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_db_url(""), "");
    }

    #[test]
    fn incomplete_means_empty_bare_scheme_or_hostless() {
        assert!(looks_incomplete(""));
        assert!(looks_incomplete("   "));
        assert!(looks_incomplete("postgresql://"));
        assert!(looks_incomplete("postgres://"));
        assert!(looks_incomplete("not-a-url"));
        assert!(!looks_incomplete("postgresql://host:5432/db"));
    }

    #[tokio::test]
    async fn non_placeholder_values_pass_through() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let resolved = resolve_indirect(
            "postgresql://u:p@host/db",
            &fetcher(runner.clone()),
            &PlatformConfig::default(),
        )
        .await;
        assert_eq!(resolved, "postgresql://u:p@host/db");
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn placeholder_resolves_through_url_fallback_keys() {
        // Auth has no DATABASE_URL, but its public URL is usable.
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::ok(
            r#"[{"key": "DATABASE_PUBLIC_URL", "value": "postgresql://u:p@host:5432/db"}]"#,
        )]));
        let resolved = resolve_indirect(
            "${Auth.DATABASE_URL}",
            &fetcher(runner),
            &PlatformConfig::default(),
        )
        .await;
        assert_eq!(resolved, "postgresql://u:p@host:5432/db");
    }

    #[tokio::test]
    async fn postgres_reference_falls_back_to_the_configured_service() {
        // Both modes fail for the reference itself, then the fallback
        // service answers in JSON mode.
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::fail("no such service"),
            ScriptedRunner::fail("no such service"),
            ScriptedRunner::ok(r#"[{"key": "PG_URL", "value": "postgresql://h:5432/db"}]"#),
        ]));
        let resolved = resolve_indirect(
            "${postgres-primary.PG_URL}",
            &fetcher(runner.clone()),
            &PlatformConfig::default(),
        )
        .await;

        assert_eq!(resolved, "postgresql://h:5432/db");
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[2][3], "Postgres");
    }

    #[tokio::test]
    async fn unresolvable_reference_passes_through() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::fail("nope"),
            ScriptedRunner::fail("nope"),
        ]));
        let resolved = resolve_indirect(
            "${Auth.DATABASE_URL}",
            &fetcher(runner),
            &PlatformConfig::default(),
        )
        .await;
        assert_eq!(resolved, "${Auth.DATABASE_URL}");
    }

    #[tokio::test]
    async fn configured_last_resort_fills_an_incomplete_candidate() {
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::ok(
            r#"[{"key": "DATABASE_URL", "value": "postgresql://"}]"#,
        )]));
        let platform = PlatformConfig {
            fallback_database_url: Some("postgresql://fallback-host:5432/db".to_string()),
            ..PlatformConfig::default()
        };
        let resolved =
            resolve_indirect("${Auth.DATABASE_URL}", &fetcher(runner), &platform).await;
        assert_eq!(resolved, "postgresql://fallback-host:5432/db");
    }
}

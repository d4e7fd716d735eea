// src/probe/connectivity.rs
use crate::config::PlatformConfig;
use crate::platform::CommandRunner;
use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

const TCP_TIMEOUT: Duration = Duration::from_secs(6);
const DRIVER_TIMEOUT: Duration = Duration::from_secs(10);
const TUNNEL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PG_PORT: u16 = 5432;

/// Outcome of one connectivity attempt. Failures are carried in the
/// message, never as an error.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub ok: bool,
    pub message: String,
}

impl ProbeResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Checks whether a Postgres endpoint is alive.
///
/// Three tiers: a raw TCP probe proves reachability, a real driver query
/// proves the database answers, and an authorized CLI tunnel stands in when
/// direct access from this network is blocked.
pub struct ConnectivityProber {
    runner: Arc<dyn CommandRunner>,
    cli: String,
    tunnel_service: String,
}

impl ConnectivityProber {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: &PlatformConfig) -> Self {
        Self {
            runner,
            cli: platform.cli.clone(),
            tunnel_service: platform.postgres_fallback_service.clone(),
        }
    }

    pub async fn check(&self, db_url: &str) -> ProbeResult {
        let tcp = self.tcp_probe(db_url).await;
        if !tcp.ok {
            debug!(message = %tcp.message, "tcp probe failed, trying the tunnel");
            return self.tunnel_probe().await;
        }

        // A reachable port is not proof of a working database, so still run
        // the query; a driver failure gets one more chance via the tunnel.
        match self.driver_probe(db_url).await {
            Ok(result) => result,
            Err(err) => {
                debug!(%err, "driver query failed, trying the tunnel");
                self.tunnel_probe().await
            }
        }
    }

    async fn tcp_probe(&self, db_url: &str) -> ProbeResult {
        let parsed = match Url::parse(db_url) {
            Ok(url) => url,
            Err(err) => return ProbeResult::fail(format!("unparseable database url: {err}")),
        };
        let host = match parsed.host_str() {
            Some(host) => host.to_string(),
            None => return ProbeResult::fail("database url has no host"),
        };
        let port = parsed.port().unwrap_or(DEFAULT_PG_PORT);

        match tokio::time::timeout(TCP_TIMEOUT, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_)) => ProbeResult::pass(format!("tcp ok {host}:{port}")),
            Ok(Err(err)) => ProbeResult::fail(format!("tcp connect to {host}:{port} failed: {err}")),
            Err(_) => ProbeResult::fail(format!("tcp connect to {host}:{port} timed out")),
        }
    }

    async fn driver_probe(&self, db_url: &str) -> anyhow::Result<ProbeResult> {
        let options = PgConnectOptions::from_str(db_url)?.ssl_mode(PgSslMode::Require);

        let one = tokio::time::timeout(DRIVER_TIMEOUT, async {
            let mut conn = PgConnection::connect_with(&options).await?;
            let one = sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(&mut conn)
                .await?;
            let _ = conn.close().await;
            Ok::<i32, sqlx::Error>(one)
        })
        .await
        .context("driver query timed out")??;

        if one == 1 {
            Ok(ProbeResult::pass("SELECT 1 ok"))
        } else {
            Ok(ProbeResult::fail(format!("unexpected SELECT 1 result: {one}")))
        }
    }

    /// Prove health through `<cli> connect <service>` by feeding the query
    /// on stdin and looking for its result in the combined output.
    async fn tunnel_probe(&self) -> ProbeResult {
        let result = self
            .runner
            .run(
                &self.cli,
                &["connect", &self.tunnel_service],
                Some("SELECT 1; \\q\n"),
                TUNNEL_TIMEOUT,
            )
            .await;

        match result {
            Ok(out) => {
                let combined = format!("{}{}", out.stdout, out.stderr);
                if out.success && combined.contains('1') {
                    ProbeResult::pass("SELECT 1 ok (via platform tunnel)")
                } else {
                    let detail: String = combined.trim().chars().take(200).collect();
                    ProbeResult::fail(format!(
                        "tunnel query failed (exit={:?}): {detail}",
                        out.exit_code
                    ))
                }
            }
            Err(err) => ProbeResult::fail(format!("tunnel command error: {err}")),
        }
    }
}

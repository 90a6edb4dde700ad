//! MySQL Probe Implementation
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Liveness is a `COM_PING` followed by `SELECT VERSION()`
//! - The whole attempt, connection setup included, runs under `tokio::time::timeout`
//! - TLS is disabled, matching the `useSSL=false` connection option

use mysql_async::{prelude::*, Conn, OptsBuilder};
use std::time::{Duration, Instant};

use crate::error::ConnectionError;
use crate::probe::{ConnectionProbe, ProbeReport};
use crate::profile::ConnectionProfile;

/// MySQL (and MariaDB) liveness probe
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlProbe;

impl ConnectionProbe for MySqlProbe {
    async fn probe(
        &self,
        profile: &ConnectionProfile,
        timeout: Duration,
    ) -> Result<ProbeReport, ConnectionError> {
        let uri = profile
            .build_connection_uri()
            .map_err(|e| ConnectionError::new(format!("refusing to probe an invalid profile: {e}")))?;
        let opts = mysql_opts(profile)?;

        tracing::debug!(%uri, user = profile.username(), "probing database");
        let start = Instant::now();

        // Dropping a `Conn` mid-flight on timeout closes its socket
        let report = tokio::time::timeout(timeout, open_and_check(opts))
            .await
            .map_err(|_| {
                ConnectionError::new(format!(
                    "no response from {}:{} within {}s",
                    profile.host(),
                    profile.port(),
                    timeout.as_secs_f32()
                ))
            })??;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            server = %report.server_info,
            "probe succeeded"
        );
        Ok(report)
    }
}

/// Build MySQL connection options from a profile
///
/// Shared by the probe and the contact store. `UPDATE` reports matched rows,
/// not changed rows, so rewriting a row with its current values still counts.
pub(crate) fn mysql_opts(profile: &ConnectionProfile) -> Result<OptsBuilder, ConnectionError> {
    let port = u16::try_from(profile.port())
        .map_err(|_| ConnectionError::new(format!("port {} is not a TCP port", profile.port())))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(profile.host())
        .tcp_port(port)
        .user(Some(profile.username()))
        .pass(Some(profile.password()))
        .db_name(Some(profile.database_name()))
        .client_found_rows(true);

    Ok(opts)
}

async fn open_and_check(opts: OptsBuilder) -> Result<ProbeReport, ConnectionError> {
    let mut conn = Conn::new(opts)
        .await
        .map_err(|e| ConnectionError::new(format!("failed to connect: {e}")))?;

    let checked = liveness_check(&mut conn).await;

    // Release the connection whether or not the check passed
    if let Err(e) = conn.disconnect().await {
        tracing::warn!(error = %e, "probe connection did not close cleanly");
    }

    checked
}

async fn liveness_check(conn: &mut Conn) -> Result<ProbeReport, ConnectionError> {
    conn.ping()
        .await
        .map_err(|e| ConnectionError::new(format!("liveness check failed: {e}")))?;

    let version: String = conn
        .query_first("SELECT VERSION()")
        .await
        .map_err(|e| ConnectionError::new(format!("failed to query server version: {e}")))?
        .ok_or_else(|| ConnectionError::new("server returned no version"))?;

    let (server_version, server_info) = parse_mysql_version(&version);
    Ok(ProbeReport { server_version, server_info })
}

/// Parse MySQL version string to detect MySQL vs MariaDB
fn parse_mysql_version(version_string: &str) -> (String, String) {
    // Example MySQL: "8.0.35"
    // Example MariaDB: "10.11.2-MariaDB"
    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string.split('-').next().unwrap_or("unknown").to_string();
        let info = format!("MariaDB {version}");
        (version, info)
    } else {
        let version = version_string
            .split_whitespace()
            .next()
            .unwrap_or(version_string)
            .to_string();
        let info = format!("MySQL {version}");
        (version, info)
    }
}

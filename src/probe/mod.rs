//! Connection Probes
//!
//! A probe is a one-shot liveness check against a candidate profile. It opens
//! one connection, checks it, and closes it again before returning. Probes
//! never touch shared state and never retry; a failed probe simply rejects
//! the reconfiguration that asked for it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::ConnectionError;
use crate::profile::ConnectionProfile;

pub mod mysql;

pub use mysql::MySqlProbe;

/// Default bound on a single probe, connection setup included
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a successful probe learned about the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Database server version string
    pub server_version: String,

    /// Server flavour and version (e.g. "MySQL 8.0.35", "MariaDB 10.11.2")
    pub server_info: String,
}

/// Liveness check against a candidate profile
///
/// Implementations must release the connection on every exit path and must
/// fail with [`ConnectionError`] when the check does not complete within
/// `timeout`.
pub trait ConnectionProbe: Send + Sync {
    fn probe(
        &self,
        profile: &ConnectionProfile,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProbeReport, ConnectionError>> + Send;
}

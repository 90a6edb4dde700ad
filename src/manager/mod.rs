//! Live Connection Target Management
//!
//! The [`ConnectionManager`] owns the only mutable shared state of the
//! service: the live connection target. It starts `Unconfigured` and moves to
//! `Configured` on the first successful [`ConnectionManager::reconfigure`].
//! There is no way back to `Unconfigured`.
//!
//! # Invariants
//! - A profile becomes live only after it validated and a probe against it
//!   succeeded. No partial or unverified configuration is ever observable.
//! - Reconfigurations are serialized: validate, probe and swap of one attempt
//!   never interleave with another attempt.
//! - Readers see the target before or after a swap, never in between. The
//!   target is an immutable `Arc<ConnectionProfile>` replaced as a whole.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::ReconfigureError;
use crate::probe::{ConnectionProbe, ProbeReport, DEFAULT_PROBE_TIMEOUT};
use crate::profile::{ConnectionProfile, RawProfileFields};

/// Read-only view of whether a live target exists
///
/// This is the seam the access gate consults.
pub trait ConfigurationState {
    fn is_configured(&self) -> bool;
}

/// Holder of the single live connection target
pub struct ConnectionManager<P> {
    probe: P,
    probe_timeout: Duration,
    live: RwLock<Option<Arc<ConnectionProfile>>>,
    reconfigure_lock: Mutex<()>,
}

impl<P: ConnectionProbe> ConnectionManager<P> {
    /// Create an unconfigured manager
    pub fn new(probe: P) -> Self {
        Self::with_timeout(probe, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create an unconfigured manager with a custom probe timeout
    pub fn with_timeout(probe: P, probe_timeout: Duration) -> Self {
        Self {
            probe,
            probe_timeout,
            live: RwLock::new(None),
            reconfigure_lock: Mutex::new(()),
        }
    }

    /// Build a profile from form fields, validate it, probe it and, only if
    /// both succeed, make it the live target
    pub async fn reconfigure(&self, raw: &RawProfileFields) -> Result<ProbeReport, ReconfigureError> {
        let profile = ConnectionProfile::from_raw(raw)?;
        self.reconfigure_with(profile).await
    }

    /// Validate, probe and adopt an already built profile
    ///
    /// On failure the previous target (or its absence) is left untouched.
    #[tracing::instrument(
        skip(self, profile),
        fields(host = %profile.host(), port = profile.port(), database = %profile.database_name())
    )]
    pub async fn reconfigure_with(
        &self,
        profile: ConnectionProfile,
    ) -> Result<ProbeReport, ReconfigureError> {
        let _serialized = self.reconfigure_lock.lock().await;

        if let Err(e) = profile.validate() {
            tracing::info!(field = %e.field, reason = %e.reason, "rejected invalid connection profile");
            return Err(e.into());
        }

        let report = match self.probe.probe(&profile, self.probe_timeout).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(cause = %e.cause, "connection probe failed, keeping previous target");
                return Err(e.into());
            }
        };

        let previous = self.swap(Arc::new(profile));
        tracing::info!(
            server = %report.server_info,
            replaced = previous.is_some(),
            "live connection target updated"
        );
        Ok(report)
    }

    /// Snapshot of the live target, if any
    #[must_use]
    pub fn current(&self) -> Option<Arc<ConnectionProfile>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Password-free description of the live target
    #[must_use]
    pub fn describe(&self) -> String {
        match self.current() {
            Some(profile) => match profile.build_connection_uri() {
                Ok(uri) => format!("URL: {uri}, Username: {}", profile.username()),
                Err(e) => format!("configuration unavailable: {e}"),
            },
            None => "not configured".to_string(),
        }
    }

    fn swap(&self, next: Arc<ConnectionProfile>) -> Option<Arc<ConnectionProfile>> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        live.replace(next)
    }
}

impl<P: ConnectionProbe> ConfigurationState for ConnectionManager<P> {
    fn is_configured(&self) -> bool {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

//! Access Gate
//!
//! Every protected operation first passes an ordered chain of preconditions:
//! 1. a database is configured
//! 2. the caller is authenticated
//!
//! The chain short-circuits on the first failure. The gate is stateless: it
//! consults the connection manager and the session but never changes the
//! live target or any session attribute. Reading the login marker counts as
//! session activity, so a gate check keeps the session from idling out.
//!
//! Authentication is a plain equality check against a single configured
//! username/password pair. There is no hashing, rate limiting or lockout.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RubricaError};
use crate::manager::ConfigurationState;
use crate::session::{SessionAttributes, LOGGED_USER};

/// Result of evaluating the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// All preconditions hold
    Allowed,
    /// No live connection target; send the caller to the configuration entry point
    DatabaseNotConfigured,
    /// Session lacks the login marker; send the caller to the login entry point
    NotAuthenticated,
}

impl GateOutcome {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Turn a denial into the matching error
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::DatabaseNotConfigured => Err(RubricaError::DatabaseNotConfigured),
            Self::NotAuthenticated => Err(RubricaError::NotAuthenticated),
        }
    }
}

/// Ordered precondition chain
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Full chain: configured, then authenticated
    pub fn evaluate<D, S>(&self, database: &D, session: &S) -> GateOutcome
    where
        D: ConfigurationState + ?Sized,
        S: SessionAttributes + ?Sized,
    {
        if !database.is_configured() {
            return GateOutcome::DatabaseNotConfigured;
        }
        if session.attribute(LOGGED_USER).is_none() {
            return GateOutcome::NotAuthenticated;
        }
        GateOutcome::Allowed
    }

    /// First step only, for the login entry point itself
    pub fn evaluate_configured<D>(&self, database: &D) -> GateOutcome
    where
        D: ConfigurationState + ?Sized,
    {
        if database.is_configured() {
            GateOutcome::Allowed
        } else {
            GateOutcome::DatabaseNotConfigured
        }
    }
}

/// The single static credential pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AuthCredentials {
    fn default() -> Self {
        Self { username: "admin".to_string(), password: "admin123".to_string() }
    }
}

impl std::fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login against the configured credential pair
#[derive(Debug, Clone)]
pub struct AuthService {
    credentials: AuthCredentials,
}

impl AuthService {
    pub fn new(credentials: AuthCredentials) -> Self {
        Self { credentials }
    }

    /// Exact comparison with the configured pair
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.credentials.username == username && self.credentials.password == password
    }

    #[must_use]
    pub fn is_logged_in<S: SessionAttributes + ?Sized>(&self, session: &S) -> bool {
        session.attribute(LOGGED_USER).is_some()
    }

    /// Set the authentication marker on the session
    pub fn login<S: SessionAttributes + ?Sized>(&self, session: &S, username: &str) {
        session.set_attribute(LOGGED_USER, username.to_string());
    }
}

//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Rubrica.
//! Every failure is local and recoverable by resubmission; none of them is
//! allowed to take the process down.
//!
//! # Error Categories
//! - `InvalidConfig`: Malformed or incomplete connection profile
//! - `UnreachableDatabase`: Probe against a candidate profile failed
//! - `DatabaseNotConfigured`: Gate denial, no live connection target yet
//! - `NotAuthenticated`: Gate denial, session lacks the login marker
//! - `InvalidInput`: Malformed contact data or identifiers
//! - `QueryFailed`: Persistence failure from the contacts layer
//! - `NotFound`: Requested contact does not exist
//! - `ConfigError`: Startup configuration file or environment errors

use std::fmt;

use thiserror::Error;

/// Field of a connection profile, used to pinpoint validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Host,
    Port,
    DatabaseName,
    Username,
    Password,
}

impl ProfileField {
    /// Field name as it appears in the configuration form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Port => "port",
            Self::DatabaseName => "dbName",
            Self::Username => "username",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First violated rule of a connection profile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: ProfileField,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: ProfileField, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

/// Probe failure: I/O error, authentication rejection, failed liveness check or timeout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("database connection failed: {cause}")]
pub struct ConnectionError {
    pub cause: String,
}

impl ConnectionError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

/// Why a reconfiguration was rejected. The live target is untouched in both cases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconfigureError {
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Unreachable database: {0}")]
    UnreachableDatabase(#[from] ConnectionError),
}

/// Main error type for Rubrica operations
#[derive(Error, Debug)]
pub enum RubricaError {
    /// Connection profile failed validation
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(ValidationError),

    /// Candidate database could not be reached
    #[error("Unreachable database: {0}")]
    UnreachableDatabase(ConnectionError),

    /// No live connection target has been configured yet
    #[error("Database not configured. Configure the database connection first.")]
    DatabaseNotConfigured,

    /// Caller is not logged in
    #[error("You must log in to access the contacts list")]
    NotAuthenticated,

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence operation failed
    #[error("Database error: {0}")]
    QueryFailed(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error (file not found, invalid JSON, missing env var)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RubricaError {
    /// Stable error code for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnreachableDatabase(_) => "UNREACHABLE_DATABASE",
            Self::DatabaseNotConfigured => "DATABASE_NOT_CONFIGURED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Human-readable message, safe to show to the user (never contains passwords)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

impl From<ValidationError> for RubricaError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidConfig(err)
    }
}

impl From<ConnectionError> for RubricaError {
    fn from(err: ConnectionError) -> Self {
        Self::UnreachableDatabase(err)
    }
}

impl From<ReconfigureError> for RubricaError {
    fn from(err: ReconfigureError) -> Self {
        match err {
            ReconfigureError::InvalidConfig(e) => Self::InvalidConfig(e),
            ReconfigureError::UnreachableDatabase(e) => Self::UnreachableDatabase(e),
        }
    }
}

/// Result type alias for Rubrica operations
pub type Result<T> = std::result::Result<T, RubricaError>;

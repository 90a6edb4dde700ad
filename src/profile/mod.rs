//! Connection Profiles
//!
//! A profile is the set of parameters identifying one database connection
//! target. Profiles are immutable: a reconfiguration builds a new profile and
//! never mutates an old one.
//!
//! # Validation Order
//! `validate()` reports the first violated rule, checked in this fixed order:
//! 1. Completeness (host, database name and username non-blank, port non-zero)
//! 2. Host (length ceiling, then RFC-1123 hostname or dotted-quad IPv4)
//! 3. Port range (1..=65535)
//! 4. Database name (length ceiling, then pattern)
//! 5. Username (length ceiling, then pattern)
//! 6. Password length
//!
//! Every use of the connection URI re-runs validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ProfileField, ValidationError};

/// Scheme of the driver connection string
pub const URI_SCHEME: &str = "mysql";

/// Driver options appended to every connection string
pub const URI_OPTIONS: &str = "useSSL=false&allowPublicKeyRetrieval=true&serverTimezone=UTC";

pub const MAX_HOST_LEN: usize = 255;
pub const MAX_DATABASE_NAME_LEN: usize = 64;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 128;

static HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"(?:(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)",
        r"|",
        r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
        r")$"
    ))
    .expect("valid regex")
});

static DATABASE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid regex"));

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@.-]{1,32}$").expect("valid regex"));

/// Configuration form submission, exactly as received
///
/// The port arrives as text; it becomes a number when the profile is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfileFields {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default, rename = "dbName")]
    pub database_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Parameters of one database connection target
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    host: String,
    port: u32,
    database_name: String,
    username: String,
    password: String,
}

impl ConnectionProfile {
    /// Build a profile. Host, database name and username are trimmed; the
    /// password is kept verbatim.
    pub fn new(
        host: impl AsRef<str>,
        port: u32,
        database_name: impl AsRef<str>,
        username: impl AsRef<str>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.as_ref().trim().to_string(),
            port,
            database_name: database_name.as_ref().trim().to_string(),
            username: username.as_ref().trim().to_string(),
            password: password.into(),
        }
    }

    /// Build a profile from a form submission
    ///
    /// A blank port becomes 0 and is reported by the completeness check.
    /// A port that is not a non-negative integer cannot be represented and
    /// is rejected here.
    pub fn from_raw(raw: &RawProfileFields) -> Result<Self, ValidationError> {
        let port_text = raw.port.trim();
        let port = if port_text.is_empty() {
            0
        } else {
            port_text.parse::<u32>().map_err(|_| {
                ValidationError::new(ProfileField::Port, "must be a number between 1 and 65535")
            })?
        };

        Ok(Self::new(
            &raw.host,
            port,
            &raw.database_name,
            &raw.username,
            raw.password.clone(),
        ))
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u32 {
        self.port
    }

    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// WARNING: Sensitive data, do not log or include in error messages
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check every rule, failing on the first violation
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check_complete()?;
        self.check_host()?;
        self.check_port()?;
        self.check_database_name()?;
        self.check_username()?;
        self.check_password()
    }

    /// Driver connection string for this profile
    ///
    /// Validates first; an invalid profile never yields a URI.
    pub fn build_connection_uri(&self) -> Result<String, ValidationError> {
        self.validate()?;
        Ok(format!(
            "{URI_SCHEME}://{}:{}/{}?{URI_OPTIONS}",
            self.host, self.port, self.database_name
        ))
    }

    fn check_complete(&self) -> Result<(), ValidationError> {
        let required = [
            (ProfileField::Host, &self.host),
            (ProfileField::DatabaseName, &self.database_name),
            (ProfileField::Username, &self.username),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, "is required"));
            }
        }
        if self.port == 0 {
            return Err(ValidationError::new(ProfileField::Port, "is required"));
        }
        Ok(())
    }

    fn check_host(&self) -> Result<(), ValidationError> {
        check_max_len(ProfileField::Host, &self.host, MAX_HOST_LEN)?;
        if !HOST_PATTERN.is_match(&self.host) {
            return Err(ValidationError::new(
                ProfileField::Host,
                format!("'{}' is not a valid hostname or IPv4 address", self.host),
            ));
        }
        Ok(())
    }

    fn check_port(&self) -> Result<(), ValidationError> {
        if !(1..=65535).contains(&self.port) {
            return Err(ValidationError::new(
                ProfileField::Port,
                format!("{} is outside the range 1-65535", self.port),
            ));
        }
        Ok(())
    }

    fn check_database_name(&self) -> Result<(), ValidationError> {
        check_max_len(ProfileField::DatabaseName, &self.database_name, MAX_DATABASE_NAME_LEN)?;
        if !DATABASE_NAME_PATTERN.is_match(&self.database_name) {
            return Err(ValidationError::new(
                ProfileField::DatabaseName,
                format!(
                    "'{}' must start with a letter or underscore and contain only letters, digits and underscores",
                    self.database_name
                ),
            ));
        }
        Ok(())
    }

    fn check_username(&self) -> Result<(), ValidationError> {
        check_max_len(ProfileField::Username, &self.username, MAX_USERNAME_LEN)?;
        if !USERNAME_PATTERN.is_match(&self.username) {
            return Err(ValidationError::new(
                ProfileField::Username,
                format!("'{}' contains characters other than letters, digits and _@.-", self.username),
            ));
        }
        Ok(())
    }

    fn check_password(&self) -> Result<(), ValidationError> {
        // The value itself must never end up in the reason
        check_max_len(ProfileField::Password, &self.password, MAX_PASSWORD_LEN)
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn check_max_len(field: ProfileField, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("exceeds the maximum length of {max} characters"),
        ));
    }
    Ok(())
}

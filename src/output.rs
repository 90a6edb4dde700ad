//! JSON Output Envelope Types
//!
//! Views and command output are plain JSON documents.
//!
//! # Output Contract
//! - View: `{"view": "...", "flash": {...}, "data": {...}}`
//! - Command success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Command error: `{"ok": false, "command": "...", "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::error::RubricaError;
use crate::session::{SessionAttributes, ERROR_MESSAGE, SUCCESS_MESSAGE};

/// One-shot messages carried across a redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(rename = "successMessage", skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl Flash {
    /// Consume pending flash messages from the session
    pub fn take<S: SessionAttributes + ?Sized>(session: &S) -> Self {
        Self {
            error: session.take_attribute(ERROR_MESSAGE),
            success: session.take_attribute(SUCCESS_MESSAGE),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.error.is_none() && self.success.is_none()
    }
}

/// Rendered page, as data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewEnvelope<T> {
    /// Page name (index, login, lista, editor)
    pub view: String,

    #[serde(default, skip_serializing_if = "Flash::is_empty")]
    pub flash: Flash,

    /// Page-specific data
    pub data: T,
}

impl<T> ViewEnvelope<T> {
    pub fn new(view: impl Into<String>, flash: Flash, data: T) -> Self {
        Self { view: view.into(), flash, data }
    }
}

/// Success envelope for command results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed
    pub command: String,

    /// Command-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for command failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Command that was attempted
    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, command: command.into(), error }
    }

    pub fn from_error(command: impl Into<String>, err: &RubricaError) -> Self {
        Self::new(command, ErrorInfo::new(err.error_code(), err.message()))
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "INVALID_CONFIG", "UNREACHABLE_DATABASE")
    pub code: String,

    /// Human-readable error message (no sensitive data)
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in command success output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,
}

impl Metadata {
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, ProfileField, ValidationError};
    use crate::session::MemorySessionStore;

    #[test]
    fn test_success_envelope_serialization() {
        let envelope = SuccessEnvelope::new(
            "check",
            serde_json::json!({"server_info": "MySQL 8.0.35"}),
            Metadata::new(42),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(json.contains(r#""command":"check""#));
        assert!(json.contains(r#""execution_ms":42"#));
    }

    #[test]
    fn test_error_envelope_from_validation_error() {
        let err = RubricaError::from(ValidationError::new(ProfileField::Port, "70000 is outside the range 1-65535"));
        let envelope = ErrorEnvelope::from_error("check", &err);

        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "INVALID_CONFIG");
        assert!(envelope.error.message.contains("70000"));
    }

    #[test]
    fn test_error_envelope_from_connection_error() {
        let err = RubricaError::from(ConnectionError::new("connection refused"));
        let json = serde_json::to_string(&ErrorEnvelope::from_error("check", &err)).unwrap();
        assert!(json.contains(r#""ok":false"#));
        assert!(json.contains(r#""code":"UNREACHABLE_DATABASE""#));
    }

    #[test]
    fn test_view_without_flash_omits_it() {
        let view = ViewEnvelope::new("login", Flash::default(), serde_json::json!({}));
        let json = serde_json::to_string(&view).unwrap();
        assert_eq!(json, r#"{"view":"login","data":{}}"#);
    }

    #[test]
    fn test_flash_is_consumed_once() {
        let store = MemorySessionStore::default();
        let session = store.resume_or_create(None);
        session.set_attribute(ERROR_MESSAGE, "Invalid credentials".to_string());

        let flash = Flash::take(&session);
        assert_eq!(flash.error.as_deref(), Some("Invalid credentials"));
        assert!(flash.success.is_none());
        assert!(Flash::take(&session).is_empty());

        let json = serde_json::to_string(&flash).unwrap();
        assert_eq!(json, r#"{"errorMessage":"Invalid credentials"}"#);
    }
}

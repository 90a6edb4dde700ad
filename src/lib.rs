//! Rubrica - Contacts Service with Runtime Database Provisioning
//!
//! Rubrica is a small contacts (address book) service whose database
//! connection is not fixed at startup. An operator supplies connection
//! parameters at runtime; they are validated, probed with a real connection,
//! and only then swapped in as the live target. Every protected operation is
//! guarded by an ordered precondition chain: a database must be configured,
//! then the caller must be authenticated.
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`profile`] - Connection parameters, validation and URI building
//! - [`probe`] - One-shot connection liveness checks
//! - [`manager`] - The single live connection target and its reconfiguration
//! - [`gate`] - Access precondition chain and static-credential login
//! - [`session`] - Per-caller session attributes
//! - [`contacts`] - Contact entity, rules and persistence
//! - [`config`] - Startup configuration
//! - [`output`] - JSON view and command envelopes
//! - [`web`] - HTTP surface

pub mod config;
pub mod contacts;
pub mod error;
pub mod gate;
pub mod manager;
pub mod output;
pub mod probe;
pub mod profile;
pub mod session;
pub mod web;

// Re-export commonly used types for convenience
pub use config::{AppConfig, StoredProfile};
pub use contacts::{Contact, ContactService, ContactStore, MySqlContactStore};
pub use error::{ConnectionError, ReconfigureError, Result, RubricaError, ValidationError};
pub use gate::{AccessGate, AuthCredentials, AuthService, GateOutcome};
pub use manager::{ConfigurationState, ConnectionManager};
pub use output::{ErrorEnvelope, ErrorInfo, Flash, Metadata, SuccessEnvelope, ViewEnvelope};
pub use probe::{ConnectionProbe, MySqlProbe, ProbeReport};
pub use profile::{ConnectionProfile, RawProfileFields};
pub use session::{MemorySessionStore, Session, SessionAttributes};

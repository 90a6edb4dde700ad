//! Contacts
//!
//! The contact entity, its field rules, and the persistence seam. Stores are
//! stateless: every operation receives the live connection profile and opens
//! its own connection, so a reconfiguration takes effect on the next call.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, RubricaError};
use crate::profile::ConnectionProfile;

pub mod mysql;

pub use mysql::MySqlContactStore;

/// Table holding the contacts
pub const CONTACTS_TABLE: &str = "lista_contatti";

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÿ\s'.-]+$").expect("valid regex"));

// Italian numbers, with or without the international prefix
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+39\s?)?((3[0-9]{2}|0[0-9]{1,3})\s?)?[0-9]{6,8}$").expect("valid regex")
});

/// One row of the contacts table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Absent until the contact is stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(rename = "nome")]
    pub first_name: String,

    #[serde(rename = "cognome")]
    pub last_name: String,

    #[serde(rename = "indirizzo", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "telefono")]
    pub phone: String,

    #[serde(rename = "eta", skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

/// Editor form submission; numeric fields arrive as text and may be blank
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub cognome: String,
    #[serde(default)]
    pub indirizzo: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub eta: String,
}

impl ContactForm {
    pub fn into_contact(self) -> Result<Contact> {
        let id = parse_optional::<u64>(&self.id, "id")?;
        let age = parse_optional::<i32>(&self.eta, "age")?;
        let address = Some(self.indirizzo.trim().to_string()).filter(|a| !a.is_empty());

        Ok(Contact {
            id,
            first_name: self.nome,
            last_name: self.cognome,
            address,
            phone: self.telefono,
            age,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(value: &str, field: &str) -> Result<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| RubricaError::invalid_input(format!("{field} '{value}' is not a valid number")))
}

/// Check names and phone number
pub fn validate_contact(contact: &Contact) -> Result<()> {
    validate_name(&contact.first_name, "first name")?;
    validate_name(&contact.last_name, "last name")?;
    validate_phone(&contact.phone)
}

fn validate_name(value: &str, field: &str) -> Result<()> {
    let value = value.trim();
    if value.chars().count() > MAX_NAME_LEN {
        return Err(RubricaError::invalid_input(format!(
            "{field} must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !NAME_PATTERN.is_match(value) {
        return Err(RubricaError::invalid_input(format!("{field} contains invalid characters")));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<()> {
    let phone = phone.trim();
    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(RubricaError::invalid_input(format!(
            "phone must not exceed {MAX_PHONE_LEN} characters"
        )));
    }
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if !PHONE_PATTERN.is_match(&compact) {
        return Err(RubricaError::invalid_input("invalid phone format"));
    }
    Ok(())
}

fn require_id(id: Option<u64>) -> Result<u64> {
    match id {
        Some(id) if id > 0 => Ok(id),
        other => Err(RubricaError::invalid_input(format!(
            "a contact id greater than zero is required, got {}",
            other.map_or_else(|| "none".to_string(), |id| id.to_string())
        ))),
    }
}

/// Persistence seam for contacts
///
/// Each method receives the live profile and is responsible for opening and
/// closing its own connection.
pub trait ContactStore: Send + Sync {
    fn list(
        &self,
        profile: &ConnectionProfile,
    ) -> impl Future<Output = Result<Vec<Contact>>> + Send;

    /// Fails with `NotFound` when no row has this id
    fn find(
        &self,
        profile: &ConnectionProfile,
        id: u64,
    ) -> impl Future<Output = Result<Contact>> + Send;

    /// Returns whether a row was written
    fn insert(
        &self,
        profile: &ConnectionProfile,
        contact: &Contact,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Returns whether a row was changed
    fn update(
        &self,
        profile: &ConnectionProfile,
        contact: &Contact,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Returns whether a row was removed
    fn delete(&self, profile: &ConnectionProfile, id: u64) -> impl Future<Output = Result<bool>> + Send;
}

/// Contact operations with input rules applied before the store is touched
#[derive(Debug, Clone)]
pub struct ContactService<S> {
    store: S,
}

impl<S: ContactStore> ContactService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(&self, profile: &ConnectionProfile) -> Result<Vec<Contact>> {
        self.store.list(profile).await
    }

    pub async fn get(&self, profile: &ConnectionProfile, id: u64) -> Result<Contact> {
        let id = require_id(Some(id))?;
        self.store.find(profile, id).await
    }

    /// Insert a new contact; it must not carry an id yet
    pub async fn create(&self, profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
        if contact.id.is_some() {
            return Err(RubricaError::invalid_input("a new contact must not have an id"));
        }
        validate_contact(contact)?;
        self.store.insert(profile, contact).await
    }

    pub async fn update(&self, profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
        require_id(contact.id)?;
        validate_contact(contact)?;
        self.store.update(profile, contact).await
    }

    pub async fn delete(&self, profile: &ConnectionProfile, id: u64) -> Result<bool> {
        let id = require_id(Some(id))?;
        self.store.delete(profile, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn mario() -> Contact {
        Contact {
            id: None,
            first_name: "Mario".to_string(),
            last_name: "Rossi".to_string(),
            address: Some("Via Roma 1".to_string()),
            phone: "+39 333 1234567".to_string(),
            age: Some(42),
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<String>>,
    }

    impl ContactStore for RecordingStore {
        async fn list(&self, _profile: &ConnectionProfile) -> Result<Vec<Contact>> {
            Ok(vec![])
        }

        async fn find(&self, _profile: &ConnectionProfile, id: u64) -> Result<Contact> {
            Err(RubricaError::not_found(format!("contact {id}")))
        }

        async fn insert(&self, _profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
            self.writes.lock().unwrap().push(format!("insert {}", contact.first_name));
            Ok(true)
        }

        async fn update(&self, _profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
            self.writes.lock().unwrap().push(format!("update {:?}", contact.id));
            Ok(true)
        }

        async fn delete(&self, _profile: &ConnectionProfile, id: u64) -> Result<bool> {
            self.writes.lock().unwrap().push(format!("delete {id}"));
            Ok(true)
        }
    }

    fn profile() -> ConnectionProfile {
        ConnectionProfile::new("localhost", 3306, "rubrica", "root", "")
    }

    #[test]
    fn test_valid_contact() {
        assert!(validate_contact(&mario()).is_ok());
    }

    #[test]
    fn test_accented_and_compound_names() {
        let mut contact = mario();
        contact.first_name = "Niccolò".to_string();
        contact.last_name = "D'Angelo-Bianchi".to_string();
        assert!(validate_contact(&contact).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        let mut contact = mario();
        contact.first_name = "Mario2".to_string();
        assert!(validate_contact(&contact).unwrap_err().message().contains("first name"));

        let mut contact = mario();
        contact.last_name = "   ".to_string();
        assert!(validate_contact(&contact).unwrap_err().message().contains("last name"));

        let mut contact = mario();
        contact.first_name = "a".repeat(101);
        assert!(validate_contact(&contact).unwrap_err().message().contains("100"));
    }

    #[test]
    fn test_phone_formats() {
        for phone in ["3331234567", "+393331234567", "+39 333 1234567", "06 1234567", "1234567"] {
            let mut contact = mario();
            contact.phone = phone.to_string();
            assert!(validate_contact(&contact).is_ok(), "{phone} should be accepted");
        }
        for phone in ["", "12345", "333-1234567", "+1 555 1234567", "+39 333 1234 5678 9012 3"] {
            let mut contact = mario();
            contact.phone = phone.to_string();
            assert!(validate_contact(&contact).is_err(), "{phone} should be rejected");
        }
    }

    #[test]
    fn test_form_conversion() {
        let form = ContactForm {
            id: " ".to_string(),
            nome: "Mario".to_string(),
            cognome: "Rossi".to_string(),
            indirizzo: String::new(),
            telefono: "3331234567".to_string(),
            eta: "30".to_string(),
        };
        let contact = form.into_contact().unwrap();
        assert_eq!(contact.id, None);
        assert_eq!(contact.address, None);
        assert_eq!(contact.age, Some(30));

        let form = ContactForm { id: "x1".to_string(), ..Default::default() };
        assert_eq!(form.into_contact().unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let service = ContactService::new(RecordingStore::default());
        let mut contact = mario();
        contact.id = Some(7);
        assert!(service.create(&profile(), &contact).await.is_err());
        assert!(service.store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_positive_id() {
        let service = ContactService::new(RecordingStore::default());
        assert!(service.update(&profile(), &mario()).await.is_err());

        let mut contact = mario();
        contact.id = Some(0);
        assert!(service.update(&profile(), &contact).await.is_err());

        contact.id = Some(3);
        assert!(service.update(&profile(), &contact).await.unwrap());
        assert_eq!(*service.store.writes.lock().unwrap(), vec!["update Some(3)".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_requires_positive_id() {
        let service = ContactService::new(RecordingStore::default());
        assert!(service.delete(&profile(), 0).await.is_err());
        assert!(service.delete(&profile(), 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_contact_never_reaches_store() {
        let service = ContactService::new(RecordingStore::default());
        let mut contact = mario();
        contact.phone = "not a phone".to_string();
        assert!(service.create(&profile(), &contact).await.is_err());
        assert!(service.store.writes.lock().unwrap().is_empty());
    }
}

//! MySQL Contact Store
//!
//! Thin parametrized-statement wrapper over the contacts table. Connections
//! are opened, used, and closed within each method call.

use mysql_async::{prelude::*, Conn};

use crate::contacts::{Contact, ContactStore};
use crate::error::{Result, RubricaError};
use crate::probe::mysql::mysql_opts;
use crate::profile::ConnectionProfile;

type ContactRow = (u64, String, String, Option<String>, Option<String>, Option<i32>);

const SELECT_ALL: &str =
    "SELECT id, nome, cognome, indirizzo, telefono, eta FROM lista_contatti ORDER BY id";
const SELECT_ONE: &str =
    "SELECT id, nome, cognome, indirizzo, telefono, eta FROM lista_contatti WHERE id = ?";
const INSERT: &str =
    "INSERT INTO lista_contatti (nome, cognome, indirizzo, telefono, eta) VALUES (?, ?, ?, ?, ?)";
const UPDATE: &str = "UPDATE lista_contatti \
     SET nome = ?, cognome = ?, indirizzo = ?, telefono = ?, eta = ? WHERE id = ?";
const DELETE: &str = "DELETE FROM lista_contatti WHERE id = ?";

/// Contacts stored in the live MySQL database
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlContactStore;

impl ContactStore for MySqlContactStore {
    async fn list(&self, profile: &ConnectionProfile) -> Result<Vec<Contact>> {
        let mut conn = connect(profile).await?;
        let rows = conn
            .query_map(SELECT_ALL, row_to_contact)
            .await
            .map_err(|e| RubricaError::query_failed(format!("Failed to list contacts: {e}")));
        release(conn).await;
        rows
    }

    async fn find(&self, profile: &ConnectionProfile, id: u64) -> Result<Contact> {
        let mut conn = connect(profile).await?;
        let row = conn
            .exec_first::<ContactRow, _, _>(SELECT_ONE, (id,))
            .await
            .map_err(|e| RubricaError::query_failed(format!("Failed to load contact {id}: {e}")));
        release(conn).await;

        row?.map(row_to_contact)
            .ok_or_else(|| RubricaError::not_found(format!("contact {id}")))
    }

    async fn insert(&self, profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
        let mut conn = connect(profile).await?;
        let written = conn
            .exec_drop(
                INSERT,
                (
                    contact.first_name.trim(),
                    contact.last_name.trim(),
                    contact.address.as_deref(),
                    contact.phone.trim(),
                    contact.age,
                ),
            )
            .await;
        let written = match written {
            Ok(()) => Ok(conn.affected_rows() > 0),
            Err(e) => Err(RubricaError::query_failed(format!("Failed to insert contact: {e}"))),
        };
        release(conn).await;
        written
    }

    async fn update(&self, profile: &ConnectionProfile, contact: &Contact) -> Result<bool> {
        let id = contact
            .id
            .ok_or_else(|| RubricaError::invalid_input("cannot update a contact without an id"))?;

        let mut conn = connect(profile).await?;
        let written = conn
            .exec_drop(
                UPDATE,
                (
                    contact.first_name.trim(),
                    contact.last_name.trim(),
                    contact.address.as_deref(),
                    contact.phone.trim(),
                    contact.age,
                    id,
                ),
            )
            .await;
        let written = match written {
            Ok(()) => Ok(conn.affected_rows() > 0),
            Err(e) => Err(RubricaError::query_failed(format!("Failed to update contact {id}: {e}"))),
        };
        release(conn).await;
        written
    }

    async fn delete(&self, profile: &ConnectionProfile, id: u64) -> Result<bool> {
        let mut conn = connect(profile).await?;
        let removed = match conn.exec_drop(DELETE, (id,)).await {
            Ok(()) => Ok(conn.affected_rows() > 0),
            Err(e) => Err(RubricaError::query_failed(format!("Failed to delete contact {id}: {e}"))),
        };
        release(conn).await;
        removed
    }
}

fn row_to_contact((id, first_name, last_name, address, phone, age): ContactRow) -> Contact {
    Contact {
        id: Some(id),
        first_name,
        last_name,
        address,
        phone: phone.unwrap_or_default(),
        age,
    }
}

async fn connect(profile: &ConnectionProfile) -> Result<Conn> {
    let opts = mysql_opts(profile)
        .map_err(|e| RubricaError::query_failed(format!("Database connection error: {}", e.cause)))?;

    Conn::new(opts)
        .await
        .map_err(|e| RubricaError::query_failed(format!("Database connection error: {e}")))
}

async fn release(conn: Conn) {
    if let Err(e) = conn.disconnect().await {
        tracing::warn!(error = %e, "contacts connection did not close cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_target_contacts_table() {
        for sql in [SELECT_ALL, SELECT_ONE, INSERT, UPDATE, DELETE] {
            assert!(sql.contains(crate::contacts::CONTACTS_TABLE), "{sql}");
        }
    }

    #[test]
    fn test_row_without_phone() {
        let contact = row_to_contact((
            4,
            "Anna".to_string(),
            "Verdi".to_string(),
            None,
            None,
            Some(30),
        ));
        assert_eq!(contact.id, Some(4));
        assert_eq!(contact.phone, "");
        assert_eq!(contact.age, Some(30));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_query_failure() {
        let profile = ConnectionProfile::new("127.0.0.1", 1, "rubrica", "root", "");
        let err = MySqlContactStore.list(&profile).await.unwrap_err();
        assert_eq!(err.error_code(), "QUERY_FAILED");
    }

    #[tokio::test]
    #[ignore] // Requires running MySQL instance with the lista_contatti table
    async fn test_update_with_unchanged_values_counts_as_written() {
        let profile = ConnectionProfile::new("localhost", 3306, "rubrica", "root", "");
        let mut contact = Contact {
            id: None,
            first_name: "Unchanged".to_string(),
            last_name: "Row".to_string(),
            address: None,
            phone: "3331234567".to_string(),
            age: Some(40),
        };
        assert!(MySqlContactStore.insert(&profile, &contact).await.unwrap());

        let stored = MySqlContactStore
            .list(&profile)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.first_name == "Unchanged" && c.last_name == "Row")
            .last()
            .unwrap();
        contact.id = stored.id;

        let written = MySqlContactStore.update(&profile, &contact).await;
        let _ = MySqlContactStore.delete(&profile, stored.id.unwrap()).await;
        assert!(written.unwrap(), "identical update must report the matched row");
    }

    #[tokio::test]
    #[ignore] // Requires running MySQL instance with the lista_contatti table
    async fn test_list_live_contacts() {
        let profile = ConnectionProfile::new("localhost", 3306, "rubrica", "root", "");
        let contacts = MySqlContactStore.list(&profile).await;
        assert!(contacts.is_ok(), "list failed: {:?}", contacts.err());
    }
}

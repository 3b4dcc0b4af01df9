/// Contact model and write payloads
///
/// A contact is the only record the service manages. The store assigns the
/// identifier (and, where the table defines them, the timestamps); the service
/// only ever writes `name`, `email` and `phone`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contacts (
///     id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     phone TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     modified_at TIMESTAMPTZ
/// );
/// ```
///
/// Email uniqueness is checked by the service before inserting. A `UNIQUE`
/// constraint on `email` is optional; when present, the conflict it raises is
/// reported as a duplicate as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Store-assigned contact identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContactId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(ContactId)
    }
}

impl From<i64> for ContactId {
    fn from(id: i64) -> Self {
        ContactId(id)
    }
}

/// Contact record as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier, assigned by the store
    pub id: ContactId,

    /// Display name
    pub name: String,

    /// Email address
    ///
    /// Unique across all contacts
    pub email: String,

    /// Phone number (may be empty or null)
    #[serde(default)]
    pub phone: Option<String>,

    /// When the record was created (only if the table provides it)
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the record was last modified (only if the table provides it)
    #[serde(default, alias = "modifiedAt", skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Input for creating a new contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,

    /// Phone number, empty when not supplied
    pub phone: String,
}

impl NewContact {
    /// Builds an insert payload, defaulting a missing phone to an empty string
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.unwrap_or_default(),
        }
    }
}

/// Partial update for an existing contact
///
/// Only `Some` fields are serialized, so a field that was not supplied is
/// never overwritten. `phone` is tri-state: `None` leaves it untouched,
/// `Some(None)` clears it and `Some(Some(_))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub phone: Option<Option<String>>,
}

impl ContactChanges {
    /// Returns true if applying these changes would not touch any field
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }

    /// Applies the supplied fields to `contact` in place
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(email) = &self.email {
            contact.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
    }
}

/// Deserializes a field that was present in the input, keeping an explicit
/// `null` as `Some(None)`
///
/// Use together with `#[serde(default)]` so that a missing field stays `None`.
pub fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Contact {
        Contact {
            id: ContactId(1),
            name: "Juan Pérez".to_string(),
            email: "juan@example.com".to_string(),
            phone: Some("123-456-7890".to_string()),
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn test_contact_id_parsing() {
        assert_eq!("42".parse::<ContactId>().unwrap(), ContactId(42));
        assert!("abc".parse::<ContactId>().is_err());
        assert!("".parse::<ContactId>().is_err());
    }

    #[test]
    fn test_contact_serializes_id_as_number() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["id"], json!(1));
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_contact_accepts_camel_case_timestamps() {
        let contact: Contact = serde_json::from_value(json!({
            "id": 7,
            "name": "Ana",
            "email": "ana@example.com",
            "phone": null,
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(contact.phone, None);
        assert!(contact.created_at.is_some());
        assert!(contact.modified_at.is_none());
    }

    #[test]
    fn test_new_contact_defaults_phone() {
        let contact = NewContact::new("Ana", "ana@example.com", None);
        assert_eq!(contact.phone, "");
    }

    #[test]
    fn test_changes_skip_absent_fields() {
        let changes = ContactChanges {
            phone: Some(Some("555".to_string())),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({ "phone": "555" }));
    }

    #[test]
    fn test_changes_keep_explicit_null_phone() {
        let changes: ContactChanges = serde_json::from_value(json!({ "phone": null })).unwrap();
        assert_eq!(changes.phone, Some(None));
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({ "phone": null }));

        let changes: ContactChanges = serde_json::from_value(json!({})).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_apply_changes_only_touches_supplied_fields() {
        let mut contact = sample();
        ContactChanges {
            phone: Some(None),
            ..Default::default()
        }
        .apply_to(&mut contact);

        assert_eq!(contact.name, "Juan Pérez");
        assert_eq!(contact.email, "juan@example.com");
        assert_eq!(contact.phone, None);
    }
}

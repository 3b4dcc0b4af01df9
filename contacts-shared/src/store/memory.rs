/// In-memory contact store
///
/// Keeps contacts in insertion order behind a `tokio::sync::RwLock`. Used by
/// the API tests and for running the server without a hosted store.
///
/// Unlike the hosted store, inserts check email uniqueness under the write
/// lock, so two concurrent creates for the same email cannot both succeed.

use super::{ContactStore, Filter, StoreError, StoreResult};
use crate::models::contact::{Contact, ContactChanges, ContactId, NewContact};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct MemoryState {
    next_id: i64,
    contacts: Vec<Contact>,
}

/// In-memory [`ContactStore`]
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store; the first inserted contact gets id 1
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_id: 1,
                contacts: Vec::new(),
            }),
        }
    }

    /// Creates a store pre-populated with `contacts`
    ///
    /// Identifiers are assigned in order starting at 1.
    pub fn with_contacts(contacts: impl IntoIterator<Item = NewContact>) -> Self {
        let mut state = MemoryState {
            next_id: 1,
            contacts: Vec::new(),
        };
        for contact in contacts {
            let record = state.build(contact);
            state.contacts.push(record);
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of stored contacts
    pub async fn len(&self) -> usize {
        self.state.read().await.contacts.len()
    }

    /// Returns true if the store holds no contacts
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.contacts.is_empty()
    }
}

impl MemoryState {
    fn build(&mut self, contact: NewContact) -> Contact {
        let id = ContactId(self.next_id);
        self.next_id += 1;

        Contact {
            id,
            name: contact.name,
            email: contact.email,
            phone: Some(contact.phone),
            created_at: Some(Utc::now()),
            modified_at: None,
        }
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn select(&self, filter: Option<&Filter>) -> StoreResult<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .iter()
            .filter(|contact| filter.map_or(true, |f| f.matches(contact)))
            .cloned()
            .collect())
    }

    async fn select_one(&self, filter: &Filter) -> StoreResult<Contact> {
        let state = self.state.read().await;
        let mut matches = state.contacts.iter().filter(|contact| filter.matches(contact));

        match (matches.next(), matches.next()) {
            (Some(contact), None) => Ok(contact.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn insert(&self, contact: NewContact) -> StoreResult<Vec<Contact>> {
        let mut state = self.state.write().await;

        if state.contacts.iter().any(|existing| existing.email == contact.email) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint: email {}",
                contact.email
            )));
        }

        let record = state.build(contact);
        state.contacts.push(record.clone());
        Ok(vec![record])
    }

    async fn update(&self, filter: &Filter, changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let updated = state
            .contacts
            .iter_mut()
            .filter(|contact| filter.matches(contact))
            .map(|contact| {
                changes.apply_to(contact);
                contact.modified_at = Some(now);
                contact.clone()
            })
            .collect();

        Ok(updated)
    }

    async fn delete(&self, filter: &Filter) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.contacts.retain(|contact| !filter.matches(contact));
        Ok(())
    }
}

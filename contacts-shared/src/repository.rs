/// Contact repository
///
/// Typed operations the API handlers call, expressed on top of an injected
/// [`ContactStore`]. The store is chosen once at startup and shared by every
/// request; tests substitute an in-memory store or a failing double.
///
/// # Example
///
/// ```
/// use contacts_shared::models::contact::NewContact;
/// use contacts_shared::repository::ContactsRepository;
/// use contacts_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repository = ContactsRepository::new(Arc::new(MemoryStore::new()));
///
/// repository
///     .create(NewContact::new("Ana", "ana@example.com", None))
///     .await?;
///
/// assert!(repository.find_by_email("ana@example.com").await?.is_some());
/// # Ok(())
/// # }
/// ```

use crate::models::contact::{Contact, ContactChanges, ContactId, NewContact};
use crate::store::{ContactStore, Filter, StoreResult};
use std::sync::Arc;
use tracing::debug;

/// Contact operations over a shared store client
#[derive(Clone)]
pub struct ContactsRepository {
    store: Arc<dyn ContactStore>,
}

impl ContactsRepository {
    /// Creates a repository over `store`
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Lists every contact in store order
    pub async fn find_all(&self) -> StoreResult<Vec<Contact>> {
        self.store.select(None).await
    }

    /// Finds a contact by ID
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no contact has this ID.
    pub async fn find_by_id(&self, id: ContactId) -> StoreResult<Contact> {
        self.store.select_one(&Filter::Id(id)).await
    }

    /// Finds a contact by email
    ///
    /// Returns the first match, or None if no contact uses this email.
    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<Contact>> {
        let matches = self.store.select(Some(&Filter::email(email))).await?;
        Ok(matches.into_iter().next())
    }

    /// Inserts a new contact and returns the created record(s)
    ///
    /// Does not check for duplicates; callers run [`Self::find_by_email`] first.
    pub async fn create(&self, contact: NewContact) -> StoreResult<Vec<Contact>> {
        self.store.insert(contact).await
    }

    /// Applies a partial update and returns the affected record(s)
    ///
    /// An empty change set performs no write: the current record is read
    /// instead, and an unknown ID yields an empty result.
    pub async fn update(&self, id: ContactId, changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        let filter = Filter::Id(id);

        if changes.is_empty() {
            debug!(%id, "Empty change set, reading contact instead of updating");
            return self.store.select(Some(&filter)).await;
        }

        self.store.update(&filter, changes).await
    }

    /// Deletes a contact by ID
    ///
    /// Succeeds whether or not the contact existed.
    pub async fn delete(&self, id: ContactId) -> StoreResult<()> {
        self.store.delete(&Filter::Id(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;

    fn repository() -> ContactsRepository {
        ContactsRepository::new(Arc::new(MemoryStore::with_contacts([
            NewContact::new("Juan Pérez", "juan@example.com", Some("123".to_string())),
            NewContact::new("María García", "maria@example.com", None),
        ])))
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let repository = repository();

        let found = repository.find_by_email("maria@example.com").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(ContactId(2)));

        let missing = repository.find_by_email("nadie@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let result = repository().find_by_id(ContactId(10)).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_with_empty_changes_reads() {
        let repository = repository();

        let current = repository
            .update(ContactId(1), ContactChanges::default())
            .await
            .unwrap();
        assert_eq!(current.len(), 1);
        assert!(current[0].modified_at.is_none());

        let missing = repository
            .update(ContactId(10), ContactChanges::default())
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_find() {
        let repository = repository();

        repository.delete(ContactId(1)).await.unwrap();

        assert!(repository.find_by_id(ContactId(1)).await.is_err());
        assert_eq!(repository.find_all().await.unwrap().len(), 1);
    }
}

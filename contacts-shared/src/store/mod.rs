/// Store client for the `contacts` collection
///
/// The service never talks to the hosted database directly. Every call goes
/// through [`ContactStore`], a small filtered select/insert/update/delete
/// facade over a single collection. Each call is independent: no ordering or
/// atomicity is assumed beyond one call touching the rows its filter matches.
///
/// # Implementations
///
/// - [`postgrest::PostgrestStore`]: the hosted store, spoken to over HTTPS
/// - [`memory::MemoryStore`]: in-process store for tests and local runs
///
/// # Example
///
/// ```
/// use contacts_shared::models::contact::NewContact;
/// use contacts_shared::store::{memory::MemoryStore, ContactStore, Filter};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.insert(NewContact::new("Ana", "ana@example.com", None)).await?;
///
/// let found = store.select(Some(&Filter::email("ana@example.com"))).await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgrest;

use crate::models::contact::{Contact, ContactChanges, ContactId, NewContact};
use async_trait::async_trait;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row (or more than one row) matched a single-row lookup
    #[error("Contact not found")]
    NotFound,

    /// The store rejected a write because of a uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// The store answered with an error response
    #[error("{message}")]
    Rejected {
        /// HTTP status of the response
        status: u16,

        /// Store-specific error code (e.g. a Postgres SQLSTATE)
        code: Option<String>,

        /// Human-readable error message reported by the store
        message: String,
    },

    /// The request never produced a response
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Invalid store response: {0}")]
    Decode(String),

    /// Client configuration is unusable
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Equality filter on a single contact column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Match the contact with this identifier
    Id(ContactId),

    /// Match contacts with this exact email
    Email(String),
}

impl Filter {
    /// Filter on the identifier column
    pub fn id(id: impl Into<ContactId>) -> Self {
        Filter::Id(id.into())
    }

    /// Filter on the email column
    pub fn email(email: impl Into<String>) -> Self {
        Filter::Email(email.into())
    }

    /// Name of the filtered column
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Id(_) => "id",
            Filter::Email(_) => "email",
        }
    }

    /// Filtered value, rendered as text
    pub fn value(&self) -> String {
        match self {
            Filter::Id(id) => id.to_string(),
            Filter::Email(email) => email.clone(),
        }
    }

    /// Returns true if `contact` satisfies this filter
    pub fn matches(&self, contact: &Contact) -> bool {
        match self {
            Filter::Id(id) => contact.id == *id,
            Filter::Email(email) => contact.email == *email,
        }
    }
}

/// Data-access facade over the `contacts` collection
///
/// All operations are asynchronous and fallible. Implementations must be
/// shareable across request tasks.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Returns every contact matching `filter` (all contacts when `None`), in
    /// store order
    async fn select(&self, filter: Option<&Filter>) -> StoreResult<Vec<Contact>>;

    /// Returns the single contact matching `filter`
    ///
    /// Fails with [`StoreError::NotFound`] when zero or several rows match.
    async fn select_one(&self, filter: &Filter) -> StoreResult<Contact>;

    /// Inserts a contact and returns the created record(s)
    async fn insert(&self, contact: NewContact) -> StoreResult<Vec<Contact>>;

    /// Applies `changes` to every contact matching `filter` and returns the
    /// affected records (empty when nothing matched)
    async fn update(&self, filter: &Filter, changes: ContactChanges) -> StoreResult<Vec<Contact>>;

    /// Deletes every contact matching `filter`
    ///
    /// Matching nothing is not an error.
    async fn delete(&self, filter: &Filter) -> StoreResult<()>;
}

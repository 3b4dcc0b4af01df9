/// Hosted store client (PostgREST dialect)
///
/// The hosted database exposes each table as a REST resource at
/// `{base}/rest/v1/{table}`. Filters are query parameters of the form
/// `column=eq.value`, writes ask for the affected rows back with
/// `Prefer: return=representation`, and single-row reads use the
/// `application/vnd.pgrst.object+json` media type, which fails with 406 unless
/// exactly one row matches.
///
/// One HTTP request is made per store call. There is no retry logic, and no
/// request deadline unless [`PostgrestConfig::timeout`] is set.
///
/// # Security
///
/// The access key is sent as both `apikey` and bearer token. It never appears
/// in `Debug` output or in logs.
///
/// # Example
///
/// ```no_run
/// use contacts_shared::store::postgrest::{PostgrestConfig, PostgrestStore};
/// use contacts_shared::store::ContactStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgrestStore::new(PostgrestConfig::new(
///     "https://project.supabase.co",
///     "service-key",
/// ))?;
///
/// let contacts = store.select(None).await?;
/// println!("{} contacts", contacts.len());
/// # Ok(())
/// # }
/// ```

use super::{ContactStore, Filter, StoreError, StoreResult};
use crate::models::contact::{Contact, ContactChanges, NewContact};
use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default table holding contacts
pub const DEFAULT_TABLE: &str = "contacts";

/// Media type asking for a single JSON object instead of an array
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error code reported when a single-object read matches zero or many rows
const NO_SINGLE_ROW: &str = "PGRST116";

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Connection settings for the hosted store
#[derive(Clone)]
pub struct PostgrestConfig {
    /// Project base URL (e.g. "https://project.supabase.co")
    pub url: String,

    /// Access key
    /// ⚠️ NEVER log this value
    pub api_key: String,

    /// Table name, `contacts` unless overridden
    pub table: String,

    /// Per-request deadline (None = wait indefinitely)
    pub timeout: Option<Duration>,
}

impl fmt::Debug for PostgrestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestConfig")
            .field("url", &self.url)
            .field("api_key", &"<REDACTED>")
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PostgrestConfig {
    /// Settings for the default table with no request deadline
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            timeout: None,
        }
    }

    /// Sets a per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// [`ContactStore`] backed by the hosted PostgREST endpoint
pub struct PostgrestStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

// Custom Debug implementation that hides the access key
impl fmt::Debug for PostgrestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl PostgrestStore {
    /// Creates a client for the configured table
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the URL or key is empty or the
    /// URL cannot be parsed, and [`StoreError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn new(config: PostgrestConfig) -> StoreResult<Self> {
        let base = config.url.trim();
        if base.is_empty() {
            return Err(StoreError::InvalidConfig("store URL is empty".to_string()));
        }
        if config.api_key.is_empty() {
            return Err(StoreError::InvalidConfig("store API key is empty".to_string()));
        }

        let raw = format!("{}/rest/v1/{}", base.trim_end_matches('/'), config.table);
        let endpoint = Url::parse(&raw)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid store URL '{}': {}", base, e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
        })
    }

    /// Resource URL for the contacts table
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn filter_param(filter: &Filter) -> (&'static str, String) {
        (filter.column(), format!("eq.{}", filter.value()))
    }

    /// Sends the request, turning non-success responses into store errors
    async fn send(builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();

        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let message = parsed
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        if status == StatusCode::NOT_ACCEPTABLE || code.as_deref() == Some(NO_SINGLE_ROW) {
            return StoreError::NotFound;
        }
        if status == StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict(message);
        }

        StoreError::Rejected {
            status: status.as_u16(),
            code,
            message,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContactStore for PostgrestStore {
    async fn select(&self, filter: Option<&Filter>) -> StoreResult<Vec<Contact>> {
        debug!(filter = ?filter.map(Filter::column), "Selecting contacts");

        let mut builder = self.request(Method::GET).query(&[("select", "*")]);
        if let Some(filter) = filter {
            builder = builder.query(&[Self::filter_param(filter)]);
        }

        Self::decode(Self::send(builder).await?).await
    }

    async fn select_one(&self, filter: &Filter) -> StoreResult<Contact> {
        debug!(filter = filter.column(), "Selecting single contact");

        let builder = self
            .request(Method::GET)
            .query(&[("select", "*")])
            .query(&[Self::filter_param(filter)])
            .header(header::ACCEPT, SINGLE_OBJECT);

        Self::decode(Self::send(builder).await?).await
    }

    async fn insert(&self, contact: NewContact) -> StoreResult<Vec<Contact>> {
        debug!("Inserting contact");

        let builder = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&[contact]);

        Self::decode(Self::send(builder).await?).await
    }

    async fn update(&self, filter: &Filter, changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        debug!(filter = filter.column(), "Updating contacts");

        let builder = self
            .request(Method::PATCH)
            .query(&[Self::filter_param(filter)])
            .header("Prefer", "return=representation")
            .json(&changes);

        Self::decode(Self::send(builder).await?).await
    }

    async fn delete(&self, filter: &Filter) -> StoreResult<()> {
        debug!(filter = filter.column(), "Deleting contacts");

        let builder = self
            .request(Method::DELETE)
            .query(&[Self::filter_param(filter)]);

        Self::send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base_url() {
        let store =
            PostgrestStore::new(PostgrestConfig::new("https://project.supabase.co/", "key")).unwrap();
        assert_eq!(
            store.endpoint().as_str(),
            "https://project.supabase.co/rest/v1/contacts"
        );
    }

    #[test]
    fn test_rejects_empty_settings() {
        let result = PostgrestStore::new(PostgrestConfig::new("", "key"));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));

        let result = PostgrestStore::new(PostgrestConfig::new("https://project.supabase.co", ""));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));

        let result = PostgrestStore::new(PostgrestConfig::new("not a url", "key"));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = PostgrestConfig::new("https://project.supabase.co", "super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));

        let store = PostgrestStore::new(config).unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_filter_param_uses_eq_operator() {
        let (column, value) = PostgrestStore::filter_param(&Filter::email("ana@example.com"));
        assert_eq!(column, "email");
        assert_eq!(value, "eq.ana@example.com");
    }
}

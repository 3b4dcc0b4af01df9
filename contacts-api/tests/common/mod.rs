//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for router-level tests:
//! - Test configuration and router construction
//! - Store doubles (recording, failing, panicking)
//! - Request helpers returning status and parsed JSON body

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use contacts_api::app::{build_router, AppState};
use contacts_api::config::Config;
use contacts_shared::models::contact::{Contact, ContactChanges, NewContact};
use contacts_shared::repository::ContactsRepository;
use contacts_shared::store::memory::MemoryStore;
use contacts_shared::store::{ContactStore, Filter, StoreError, StoreResult};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::Service as _;

/// Configuration pointing at a store that is never contacted
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SUPABASE_URL" => Some("http://store.invalid".to_string()),
        "SUPABASE_KEY" => Some("test-key".to_string()),
        "APP_ENV" => Some("test".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

/// Memory store that counts write calls
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl RecordingStore {
    pub fn seeded() -> Self {
        Self {
            inner: MemoryStore::with_contacts([
                NewContact::new("Juan Pérez", "juan@example.com", Some("123-456-7890".to_string())),
                NewContact::new("María García", "maria@example.com", Some("098-765-4321".to_string())),
            ]),
            ..Default::default()
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactStore for RecordingStore {
    async fn select(&self, filter: Option<&Filter>) -> StoreResult<Vec<Contact>> {
        self.inner.select(filter).await
    }

    async fn select_one(&self, filter: &Filter) -> StoreResult<Contact> {
        self.inner.select_one(filter).await
    }

    async fn insert(&self, contact: NewContact) -> StoreResult<Vec<Contact>> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(contact).await
    }

    async fn update(&self, filter: &Filter, changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(filter, changes).await
    }

    async fn delete(&self, filter: &Filter) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(filter).await
    }
}

pub const STORE_FAILURE: &str = "connection refused";

/// Store whose calls fail
///
/// With `reads_ok`, `select` answers an empty list and only writes fail.
pub struct FailingStore {
    pub reads_ok: bool,
}

impl FailingStore {
    fn failure() -> StoreError {
        StoreError::Rejected {
            status: 503,
            code: None,
            message: STORE_FAILURE.to_string(),
        }
    }
}

#[async_trait]
impl ContactStore for FailingStore {
    async fn select(&self, _filter: Option<&Filter>) -> StoreResult<Vec<Contact>> {
        if self.reads_ok {
            Ok(Vec::new())
        } else {
            Err(Self::failure())
        }
    }

    async fn select_one(&self, _filter: &Filter) -> StoreResult<Contact> {
        Err(Self::failure())
    }

    async fn insert(&self, _contact: NewContact) -> StoreResult<Vec<Contact>> {
        Err(Self::failure())
    }

    async fn update(&self, _filter: &Filter, _changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        Err(Self::failure())
    }

    async fn delete(&self, _filter: &Filter) -> StoreResult<()> {
        Err(Self::failure())
    }
}

/// Store that panics on every call
pub struct PanickingStore;

#[async_trait]
impl ContactStore for PanickingStore {
    async fn select(&self, _filter: Option<&Filter>) -> StoreResult<Vec<Contact>> {
        panic!("store exploded")
    }

    async fn select_one(&self, _filter: &Filter) -> StoreResult<Contact> {
        panic!("store exploded")
    }

    async fn insert(&self, _contact: NewContact) -> StoreResult<Vec<Contact>> {
        panic!("store exploded")
    }

    async fn update(&self, _filter: &Filter, _changes: ContactChanges) -> StoreResult<Vec<Contact>> {
        panic!("store exploded")
    }

    async fn delete(&self, _filter: &Filter) -> StoreResult<()> {
        panic!("store exploded")
    }
}

/// Router over a given store
pub fn app_with(store: Arc<dyn ContactStore>) -> axum::Router {
    let state = AppState::new(ContactsRepository::new(store), test_config());
    build_router(state)
}

/// Test context over a seeded recording store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<RecordingStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(RecordingStore::seeded());
        let app = app_with(store.clone());
        Self { app, store }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.app, method, uri, body).await
    }
}

/// Sends a request and returns the status with the parsed JSON body
/// (`Value::Null` when the body is empty)
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

/// Sends a prepared request
pub async fn send_request(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().call(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            panic!("response is not JSON: {}", String::from_utf8_lossy(&body))
        })
    };

    (status, json)
}

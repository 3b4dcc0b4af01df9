//! # Contacts Shared Library
//!
//! Types and data access shared by the contacts API server.
//!
//! ## Module Organization
//!
//! - `models`: Contact record and its write payloads
//! - `store`: Store client trait, hosted (PostgREST) and in-memory implementations
//! - `repository`: Typed contact operations on top of a store client

pub mod models;
pub mod repository;
pub mod store;

/// Current version of the contacts shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

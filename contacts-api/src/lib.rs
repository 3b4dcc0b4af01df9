//! # Contacts API Server Library
//!
//! This library provides the core functionality for the contacts API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `response`: Uniform JSON response envelope
//! - `routes`: API route handlers
//! - `telemetry`: Logging and telemetry setup

pub mod app;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod telemetry;

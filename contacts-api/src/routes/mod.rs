/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Service description and liveness endpoints
/// - `contacts`: Contact CRUD endpoints

pub mod contacts;
pub mod health;

use crate::response::Envelope;
use axum::{http::StatusCode, Json};

/// Message returned for unknown paths and methods
pub const ENDPOINT_NOT_FOUND: &str = "Endpoint no encontrado";

/// Fallback for any unmatched path or method
pub async fn not_found() -> (StatusCode, Json<Envelope<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(ENDPOINT_NOT_FOUND, None)),
    )
}

/// Service description and health check endpoints
///
/// # Endpoints
///
/// ```text
/// GET /        -> service name, version and endpoint list
/// GET /health  -> liveness
/// ```
///
/// # Health response
///
/// ```json
/// {
///   "status": "OK",
///   "timestamp": "2025-01-03T12:00:00.000Z",
///   "uptime": 42.17
/// }
/// ```
///
/// Liveness only: the hosted store is not contacted.

use crate::app::AppState;
use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "OK" while the process serves requests
    pub status: String,

    /// Current time (RFC 3339, UTC)
    pub timestamp: String,

    /// Seconds since the application started
    pub uptime: f64,
}

/// Service description
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

/// Endpoint list shown on the service description
#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(rename = "GET /api/contacts")]
    pub list: String,

    #[serde(rename = "GET /api/contacts/:id")]
    pub get: String,

    #[serde(rename = "POST /api/contacts")]
    pub create: String,

    #[serde(rename = "PUT /api/contacts/:id")]
    pub update: String,

    #[serde(rename = "DELETE /api/contacts/:id")]
    pub delete: String,
}

/// Service description handler
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "API de Contactos".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: Endpoints {
            list: "Obtener todos los contactos".to_string(),
            get: "Obtener contacto por ID".to_string(),
            create: "Crear nuevo contacto".to_string(),
            update: "Actualizar contacto".to_string(),
            delete: "Eliminar contacto".to_string(),
        },
    })
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

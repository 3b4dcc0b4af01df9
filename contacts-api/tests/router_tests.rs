/// Integration tests for the router surface around the contact endpoints:
/// service description, health, fallbacks and panic recovery

mod common;

use axum::http::StatusCode;
use common::{app_with, send, PanickingStore, TestContext};
use std::sync::Arc;

#[tokio::test]
async fn test_service_info() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API de Contactos");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        body["endpoints"]["DELETE /api/contacts/:id"],
        "Eliminar contacto"
    );
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_unknown_path() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/api/unknown", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Endpoint no encontrado");
}

#[tokio::test]
async fn test_unsupported_method() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("PATCH", "/api/contacts"),
        ("POST", "/api/contacts/1"),
        ("DELETE", "/health"),
    ] {
        let (status, body) = ctx.send(method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["message"], "Endpoint no encontrado");
    }
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let app = app_with(Arc::new(PanickingStore));

    let (status, body) = send(&app, "GET", "/api/contacts", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Error interno del servidor");
}

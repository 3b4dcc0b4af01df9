/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses in
/// the failure envelope (`{ "success": false, "message": ... }`). Handlers
/// return `Result<T, ApiError>`; nothing is allowed to escape to the router
/// as anything other than an envelope.
///
/// Messages are the user-facing strings and are returned as-is. Whether a
/// handler includes the underlying store detail is decided by the handler.
///
/// # Example
///
/// ```
/// use contacts_api::error::{ApiError, ApiResult};
/// use contacts_api::response::Envelope;
/// use axum::Json;
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<Envelope<String>>> {
///     let name = name.ok_or_else(|| ApiError::BadRequest("Nombre requerido".to_string()))?;
///     Ok(Json(Envelope::data(name)))
/// }
/// ```

use crate::response::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Generic message for failures without a better description
pub const INTERNAL_ERROR: &str = "Error interno del servidor";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - missing or malformed input
    BadRequest(String),

    /// Not found (404)
    NotFound {
        message: String,

        /// Underlying failure detail, returned to the client when present
        detail: Option<String>,
    },

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Internal server error (500)
    InternalError(String),
}

impl ApiError {
    /// Not found without detail
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
            detail: None,
        }
    }

    /// Returns the HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::NotFound { message, .. } => write!(f, "Not found: {}", message),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::BadRequest(msg) | ApiError::Conflict(msg) => Envelope::failure(msg, None),
            ApiError::NotFound { message, detail } => Envelope::failure(message, detail),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                let msg = if msg.is_empty() {
                    INTERNAL_ERROR.to_string()
                } else {
                    msg
                };
                Envelope::failure(msg, None)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::not_found("Contacto no encontrado");
        assert_eq!(err.to_string(), "Not found: Contacto no encontrado");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InternalError(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_empty_internal_message_falls_back() {
        let response = ApiError::InternalError(String::new()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], INTERNAL_ERROR);
    }
}

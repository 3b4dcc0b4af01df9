/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use contacts_api::{app::AppState, config::Config};
/// use contacts_shared::repository::ContactsRepository;
/// use contacts_shared::store::postgrest::PostgrestStore;
/// use std::sync::Arc;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = PostgrestStore::new(config.store.clone())?;
/// let state = AppState::new(ContactsRepository::new(Arc::new(store)), config);
/// let app = contacts_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, error::INTERNAL_ERROR, routes, telemetry::REQUEST_TARGET};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use contacts_shared::repository::ContactsRepository;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Contact repository over the configured store
    pub contacts: ContactsRepository,

    /// Application configuration
    pub config: Arc<Config>,

    /// When the application was built, for the health uptime
    pub started_at: Instant,
}

impl AppState {
    /// Creates new application state
    pub fn new(contacts: ContactsRepository, config: Config) -> Self {
        Self {
            contacts,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /                         # Service description
/// ├── GET /health                   # Liveness
/// └── /api/contacts
///     ├── GET    /                  # List contacts
///     ├── POST   /                  # Create contact
///     ├── GET    /:id               # Get contact
///     ├── PUT    /:id               # Update contact
///     └── DELETE /:id               # Delete contact
/// ```
///
/// Any other path or method answers 404 in the failure envelope.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Panic recovery (tower-http CatchPanicLayer, answers 500)
/// 4. Request telemetry (one event per request, panics included)
pub fn build_router(state: AppState) -> Router {
    let contact_routes = Router::new()
        .route(
            "/",
            get(routes::contacts::list_contacts)
                .post(routes::contacts::create_contact)
                .fallback(routes::not_found),
        )
        .route(
            "/:id",
            get(routes::contacts::get_contact)
                .put(routes::contacts::update_contact)
                .delete(routes::contacts::delete_contact)
                .fallback(routes::not_found),
        );

    let meta_routes = Router::new()
        .route(
            "/",
            get(routes::health::service_info).fallback(routes::not_found),
        )
        .route(
            "/health",
            get(routes::health::health_check).fallback(routes::not_found),
        );

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(meta_routes)
        .nest("/api/contacts", contact_routes)
        .fallback(routes::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(track_request))
        .with_state(state)
}

/// Configures CORS: permissive when origins contain `*`
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Emits the request event exported as request telemetry
async fn track_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    tracing::info!(
        target: REQUEST_TARGET,
        method = %method,
        path = %path,
        status,
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "{} {} {}",
        method,
        path,
        status
    );

    response
}

/// Turns a handler panic into the generic 500 envelope
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    ApiError::InternalError(INTERNAL_ERROR.to_string()).into_response()
}

//! # Contacts API Server
//!
//! REST API for managing contacts (name, email, phone) stored in a hosted
//! PostgREST database.
//!
//! ## Usage
//!
//! ```bash
//! SUPABASE_URL=https://project.supabase.co SUPABASE_KEY=... cargo run -p contacts-api
//! ```
//!
//! With `APP_ENV=test` the application is built but the server does not
//! listen.

use contacts_api::{
    app::{build_router, AppState},
    config::Config,
    telemetry,
};
use contacts_shared::{repository::ContactsRepository, store::postgrest::PostgrestStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let telemetry = telemetry::init(&config.telemetry);

    tracing::info!(
        "Contacts API v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = PostgrestStore::new(config.store.clone())?;
    tracing::info!(endpoint = %store.endpoint(), "Using hosted contact store");

    let bind_address = config.bind_address();
    let mode = config.api.mode;
    let state = AppState::new(ContactsRepository::new(Arc::new(store)), config);
    let app = build_router(state);

    if !mode.listens() {
        tracing::info!("APP_ENV=test, not listening");
        telemetry.shutdown().await;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Flushing telemetry");
    telemetry.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    tracing::info!("Received {}, shutting down...", signal);
}

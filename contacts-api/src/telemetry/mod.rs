/// Logging and telemetry setup
///
/// Logs always go through `tracing` with an `EnvFilter` (from `RUST_LOG`).
/// When an Application Insights connection string is configured, an
/// [`exporter::ExportLayer`] is added next to the console output: it turns
/// info-and-above events into trace telemetry and request events into request
/// telemetry, and a background task posts them to the ingestion endpoint.
/// The instrumentation key is never logged. Without a connection string
/// telemetry is disabled and a warning is logged.

pub mod exporter;

use std::fmt;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use exporter::REQUEST_TARGET;

const DEFAULT_FILTER: &str = "contacts_api=debug,contacts_shared=debug,tower_http=debug";
const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Telemetry configuration
#[derive(Clone, Default)]
pub struct TelemetryConfig {
    /// Raw connection string (`InstrumentationKey=...;IngestionEndpoint=...`)
    pub connection_string: Option<String>,
}

impl fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Parsed telemetry connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    pub ingestion_endpoint: Option<String>,
}

impl ConnectionString {
    /// Parses `Key=Value` pairs separated by `;`
    ///
    /// Keys are case-insensitive. `InstrumentationKey` is required.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("malformed segment '{}'", pair))?;

            match key.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.trim().to_string()),
                "ingestionendpoint" => ingestion_endpoint = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| "missing InstrumentationKey".to_string())?;

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint,
        })
    }

    /// Track API URL on the ingestion endpoint
    pub fn track_url(&self) -> String {
        let endpoint = self
            .ingestion_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_INGESTION_ENDPOINT);
        format!("{}/v2/track", endpoint.trim_end_matches('/'))
    }
}

/// Outcome of telemetry setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryStatus {
    /// No connection string configured
    Disabled,

    /// Connection string present but unusable
    Invalid(String),

    /// Exporting to the ingestion endpoint
    Enabled(ConnectionString),
}

impl TelemetryConfig {
    /// Works out what telemetry mode the configuration asks for
    pub fn status(&self) -> TelemetryStatus {
        match self.connection_string.as_deref() {
            None => TelemetryStatus::Disabled,
            Some(raw) => match ConnectionString::parse(raw) {
                Ok(parsed) => TelemetryStatus::Enabled(parsed),
                Err(reason) => TelemetryStatus::Invalid(reason),
            },
        }
    }
}

/// Installed telemetry, flushed with [`Telemetry::shutdown`]
#[derive(Debug)]
pub struct Telemetry {
    pub status: TelemetryStatus,
    guard: Option<exporter::ExportGuard>,
}

impl Telemetry {
    /// Sends whatever is still queued and stops the export task
    pub async fn shutdown(self) {
        if let Some(guard) = self.guard {
            guard.shutdown().await;
        }
    }
}

/// Installs the global tracing subscriber and starts the exporter
///
/// Must be called inside the Tokio runtime. Never fails: a missing or
/// malformed connection string only produces a warning.
pub fn init(config: &TelemetryConfig) -> Telemetry {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let mut status = config.status();

    let mut guard = None;
    let export_layer = match &status {
        TelemetryStatus::Enabled(connection) => {
            match reqwest::Client::builder().timeout(EXPORT_TIMEOUT).build() {
                Ok(client) => {
                    let (layer, export_guard) = exporter::spawn(connection, client);
                    guard = Some(export_guard);
                    Some(layer)
                }
                Err(e) => {
                    status = TelemetryStatus::Invalid(format!("HTTP client: {}", e));
                    None
                }
            }
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(export_layer)
        .init();

    match &status {
        TelemetryStatus::Disabled => {
            tracing::warn!("APPLICATIONINSIGHTS_CONNECTION_STRING not set, telemetry disabled");
        }
        TelemetryStatus::Invalid(reason) => {
            tracing::warn!(reason = %reason, "Invalid telemetry connection string, telemetry disabled");
        }
        TelemetryStatus::Enabled(connection) => {
            tracing::info!(
                url = %connection.track_url(),
                "Telemetry enabled, exporting to Application Insights"
            );
        }
    }

    Telemetry { status, guard }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_string() {
        let parsed = ConnectionString::parse(
            "InstrumentationKey=abc-123;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/;LiveEndpoint=https://live",
        )
        .unwrap();

        assert_eq!(parsed.instrumentation_key, "abc-123");
        assert_eq!(
            parsed.ingestion_endpoint.as_deref(),
            Some("https://westeurope-5.in.applicationinsights.azure.com/")
        );
    }

    #[test]
    fn test_track_url() {
        let parsed = ConnectionString::parse(
            "InstrumentationKey=k;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/",
        )
        .unwrap();
        assert_eq!(
            parsed.track_url(),
            "https://westeurope-5.in.applicationinsights.azure.com/v2/track"
        );

        let parsed = ConnectionString::parse("InstrumentationKey=k").unwrap();
        assert_eq!(parsed.track_url(), "https://dc.services.visualstudio.com/v2/track");
    }

    #[test]
    fn test_parse_requires_key() {
        assert!(ConnectionString::parse("IngestionEndpoint=https://x").is_err());
        assert!(ConnectionString::parse("garbage").is_err());
        assert!(ConnectionString::parse("InstrumentationKey=").is_err());
    }

    #[test]
    fn test_status() {
        assert_eq!(TelemetryConfig::default().status(), TelemetryStatus::Disabled);

        let config = TelemetryConfig {
            connection_string: Some("nonsense".to_string()),
        };
        assert!(matches!(config.status(), TelemetryStatus::Invalid(_)));

        let config = TelemetryConfig {
            connection_string: Some("instrumentationkey=k".to_string()),
        };
        assert!(matches!(config.status(), TelemetryStatus::Enabled(_)));
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let config = TelemetryConfig {
            connection_string: Some("InstrumentationKey=secret".to_string()),
        };
        assert!(!format!("{:?}", config).contains("secret"));
    }
}

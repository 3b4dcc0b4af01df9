/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `SUPABASE_URL`: Hosted store base URL (required)
/// - `SUPABASE_KEY`: Hosted store access key (required)
/// - `SUPABASE_TIMEOUT_SECONDS`: Per-request store deadline (default: none)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to (default: 3000)
/// - `APP_ENV`: `development`, `production` or `test` (default: development).
///   `test` builds the application without listening.
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `APPLICATIONINSIGHTS_CONNECTION_STRING`: Telemetry connection (optional)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use contacts_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use crate::telemetry::TelemetryConfig;
use contacts_shared::store::postgrest::PostgrestConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Hosted store configuration
    pub store: PostgrestConfig,

    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Process mode
    pub mode: RunMode,
}

/// Process mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
    /// Application is built for a test harness and never listens
    Test,
}

impl RunMode {
    /// Returns true if the server should bind and accept connections
    pub fn listens(self) -> bool {
        self != RunMode::Test
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            "test" => Ok(RunMode::Test),
            other => anyhow::bail!("unknown APP_ENV '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `SUPABASE_URL` or `SUPABASE_KEY` is missing
    /// - A variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?;

        let mode = match var("APP_ENV") {
            Some(value) => value.parse()?,
            None => RunMode::Development,
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let store_url = var("SUPABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL environment variable is required"))?;
        let store_key = var("SUPABASE_KEY")
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_KEY environment variable is required"))?;

        let mut store = PostgrestConfig::new(store_url, store_key);
        if let Some(seconds) = var("SUPABASE_TIMEOUT_SECONDS") {
            let seconds = seconds
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("SUPABASE_TIMEOUT_SECONDS must be a number: {}", e))?;
            store = store.with_timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                mode,
            },
            store,
            telemetry: TelemetryConfig {
                connection_string: var("APPLICATIONINSIGHTS_CONNECTION_STRING"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Application Insights export
///
/// [`ExportLayer`] converts `tracing` events into telemetry envelopes and
/// queues them on an unbounded channel; the task started by [`spawn`] posts
/// them in batches to the track endpoint, every [`FLUSH_INTERVAL`] or as soon
/// as [`MAX_BATCH`] are queued. [`ExportGuard::shutdown`] drains the queue
/// before the process exits.
///
/// Events with target [`REQUEST_TARGET`] become request telemetry and must
/// carry `method`, `path`, `status` and `duration_ms`. Every other event at
/// info or above becomes trace telemetry with its fields as properties.

use super::ConnectionString;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Target of the per-request event emitted by the router
pub const REQUEST_TARGET: &str = "contacts_api::request";

pub const MAX_BATCH: usize = 100;
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

const ROLE_NAME: &str = "contacts-api";

/// Targets never exported: the exporter itself and the HTTP stack it uses
const SKIPPED_TARGETS: &[&str] = &["contacts_api::telemetry", "reqwest", "hyper", "h2"];

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Tracing layer feeding the export task
#[derive(Debug)]
pub struct ExportLayer {
    instrumentation_key: String,
    sender: mpsc::UnboundedSender<Value>,
}

impl<S: Subscriber> Layer<S> for ExportLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();

        if *metadata.level() > Level::INFO
            || SKIPPED_TARGETS.iter().any(|skipped| target.starts_with(skipped))
        {
            return;
        }

        let mut fields = FieldMap::default();
        event.record(&mut fields);

        let envelope = if target == REQUEST_TARGET {
            request_envelope(&self.instrumentation_key, Utc::now(), &fields.0)
        } else {
            message_envelope(
                &self.instrumentation_key,
                Utc::now(),
                *metadata.level(),
                target,
                fields.0,
            )
        };

        // Fails only once the task has stopped
        self.sender.send(envelope).ok();
    }
}

/// Handle on the export task
#[derive(Debug)]
pub struct ExportGuard {
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl ExportGuard {
    /// Flushes queued telemetry and waits for the task to finish
    pub async fn shutdown(self) {
        self.shutdown.send(()).ok();
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Telemetry export task failed");
        }
    }
}

/// Starts the export task for `connection`
///
/// Must be called inside the Tokio runtime.
pub fn spawn(connection: &ConnectionString, client: reqwest::Client) -> (ExportLayer, ExportGuard) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = oneshot::channel();

    let worker = tokio::spawn(run(client, connection.track_url(), receiver, shutdown_rx));

    let layer = ExportLayer {
        instrumentation_key: connection.instrumentation_key.clone(),
        sender,
    };

    (layer, ExportGuard { shutdown, worker })
}

async fn run(
    client: reqwest::Client,
    url: String,
    mut receiver: mpsc::UnboundedReceiver<Value>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut batch = Vec::new();
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            Some(envelope) = receiver.recv() => {
                batch.push(envelope);
                if batch.len() >= MAX_BATCH {
                    flush(&client, &url, &mut batch).await;
                }
            }
            _ = ticker.tick() => flush(&client, &url, &mut batch).await,
            _ = &mut shutdown => {
                while let Ok(envelope) = receiver.try_recv() {
                    batch.push(envelope);
                }
                flush(&client, &url, &mut batch).await;
                break;
            }
        }
    }

    tracing::debug!("Telemetry export stopped");
}

/// Posts the batch; failed batches are dropped
async fn flush(client: &reqwest::Client, url: &str, batch: &mut Vec<Value>) {
    if batch.is_empty() {
        return;
    }

    let envelopes = std::mem::take(batch);
    match client.post(url).json(&envelopes).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::trace!(count = envelopes.len(), "Telemetry exported");
        }
        Ok(response) => {
            tracing::warn!(
                status = %response.status(),
                count = envelopes.len(),
                "Telemetry ingestion rejected batch"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, count = envelopes.len(), "Telemetry export failed");
        }
    }
}

/// Event fields as JSON values
#[derive(Default)]
struct FieldMap(Map<String, Value>);

impl Visit for FieldMap {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), json!(value));
    }
}

fn envelope(
    instrumentation_key: &str,
    time: DateTime<Utc>,
    kind: &str,
    base_type: &str,
    base_data: Value,
) -> Value {
    json!({
        "name": format!("Microsoft.ApplicationInsights.{}", kind),
        "time": time.to_rfc3339_opts(SecondsFormat::Millis, true),
        "iKey": instrumentation_key,
        "tags": { "ai.cloud.role": ROLE_NAME },
        "data": { "baseType": base_type, "baseData": base_data },
    })
}

/// Trace telemetry for a log event
pub fn message_envelope(
    instrumentation_key: &str,
    time: DateTime<Utc>,
    level: Level,
    target: &str,
    mut fields: Map<String, Value>,
) -> Value {
    let message = match fields.remove("message") {
        Some(Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let mut properties: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| (name, Value::String(property_text(value))))
        .collect();
    properties.insert("target".to_string(), Value::String(target.to_string()));

    envelope(
        instrumentation_key,
        time,
        "Message",
        "MessageData",
        json!({
            "ver": 2,
            "message": message,
            "severityLevel": severity_level(level),
            "properties": properties,
        }),
    )
}

/// Request telemetry for a completed request event
pub fn request_envelope(
    instrumentation_key: &str,
    time: DateTime<Utc>,
    fields: &Map<String, Value>,
) -> Value {
    let text = |name: &str| fields.get(name).cloned().map(property_text).unwrap_or_default();
    let status = fields.get("status").and_then(Value::as_u64).unwrap_or_default();
    let duration_ms = fields
        .get("duration_ms")
        .and_then(Value::as_f64)
        .unwrap_or_default();
    let path = text("path");

    envelope(
        instrumentation_key,
        time,
        "Request",
        "RequestData",
        json!({
            "ver": 2,
            "id": format!("{:016x}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)),
            "name": format!("{} {}", text("method"), path),
            "duration": format_duration(Duration::from_micros((duration_ms.max(0.0) * 1000.0).round() as u64)),
            "responseCode": status.to_string(),
            "success": status < 400,
            "url": path,
        }),
    )
}

/// Severity levels of the ingestion schema (0 verbose .. 3 error)
fn severity_level(level: Level) -> u8 {
    match level {
        Level::TRACE | Level::DEBUG => 0,
        Level::INFO => 1,
        Level::WARN => 2,
        _ => 3,
    }
}

/// `d.hh:mm:ss.ffffff`, the duration format the ingestion API expects
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    let seconds = micros / 1_000_000;

    format!(
        "{}.{:02}:{:02}:{:02}.{:06}",
        seconds / 86_400,
        seconds / 3_600 % 24,
        seconds / 60 % 60,
        seconds % 60,
        micros % 1_000_000
    )
}

fn property_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

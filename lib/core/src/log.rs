//! Structured event logging.
//!
//! Components that must never surface failures to end users (the session
//! bridge, the authorization gate) still need those failures to be observable.
//! They record them through an [`EventLogger`], which builds a [`LogRecord`]
//! and hands it to a [`LogSink`]. The default sink forwards to `tracing`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns true for severities that carry error context.
    #[must_use]
    pub fn carries_error(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The triggering error of an ERROR or CRITICAL record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// One-line error message.
    pub message: String,
    /// Full rendering of the error, including any context chain.
    pub stack: String,
}

impl ErrorContext {
    /// Captures the message and full rendering of an error.
    #[must_use]
    pub fn capture<E>(error: &E) -> Self
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        let rendered = error.to_string();
        let message = rendered
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            message,
            stack: format!("{error:?}"),
        }
    }
}

/// A single structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub severity: Severity,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub payload: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorContext>,
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Emits one record. Must not fail or block for long.
    fn emit(&self, record: &LogRecord);
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let payload = record.payload.to_string();
        let environment = record.environment.as_str();
        let event = record.event.as_str();
        match (record.severity, &record.error) {
            (Severity::Debug, _) => {
                tracing::debug!(event, environment, payload = %payload, "{event}");
            }
            (Severity::Info, _) => {
                tracing::info!(event, environment, payload = %payload, "{event}");
            }
            (Severity::Warning, _) => {
                tracing::warn!(event, environment, payload = %payload, "{event}");
            }
            (Severity::Error, Some(error)) => {
                tracing::error!(
                    event,
                    environment,
                    payload = %payload,
                    error = %error.message,
                    stack = %error.stack,
                    "{event}"
                );
            }
            (Severity::Error, None) => {
                tracing::error!(event, environment, payload = %payload, "{event}");
            }
            (Severity::Critical, Some(error)) => {
                tracing::error!(
                    critical = true,
                    event,
                    environment,
                    payload = %payload,
                    error = %error.message,
                    stack = %error.stack,
                    "{event}"
                );
            }
            (Severity::Critical, None) => {
                tracing::error!(critical = true, event, environment, payload = %payload, "{event}");
            }
        }
    }
}

/// Keeps records in memory so tests can assert on what was logged.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record emitted so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the records with the given event name.
    #[must_use]
    pub fn events(&self, event: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Builds and emits structured log records for one deployment environment.
#[derive(Clone)]
pub struct EventLogger {
    environment: Arc<str>,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLogger")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl EventLogger {
    /// Creates a logger that forwards to `tracing`.
    #[must_use]
    pub fn new(environment: impl Into<String>) -> Self {
        Self::with_sink(environment, Arc::new(TracingSink))
    }

    /// Creates a logger with an explicit sink.
    #[must_use]
    pub fn with_sink(environment: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            environment: Arc::from(environment.into()),
            sink,
        }
    }

    /// Returns the environment name stamped on every record.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn debug(&self, event: &str, payload: JsonValue) {
        self.record(Severity::Debug, event, payload, None);
    }

    pub fn info(&self, event: &str, payload: JsonValue) {
        self.record(Severity::Info, event, payload, None);
    }

    pub fn warning(&self, event: &str, payload: JsonValue) {
        self.record(Severity::Warning, event, payload, None);
    }

    /// Records an ERROR entry with the triggering error's message and rendering.
    pub fn error<E>(&self, event: &str, error: &E, payload: JsonValue)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.record(
            Severity::Error,
            event,
            payload,
            Some(ErrorContext::capture(error)),
        );
    }

    /// Records a CRITICAL entry with the triggering error's message and rendering.
    pub fn critical<E>(&self, event: &str, error: &E, payload: JsonValue)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.record(
            Severity::Critical,
            event,
            payload,
            Some(ErrorContext::capture(error)),
        );
    }

    fn record(
        &self,
        severity: Severity,
        event: &str,
        payload: JsonValue,
        error: Option<ErrorContext>,
    ) {
        let record = LogRecord {
            severity,
            event: event.to_string(),
            timestamp: Utc::now(),
            environment: self.environment.to_string(),
            payload,
            error,
        };
        self.sink.emit(&record);
    }
}

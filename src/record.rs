// record.rs
// Purpose: Severity levels and the structured log record stamped by the dispatcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// LogLevel classifies the severity of a record; totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Urgent levels force an immediate remote flush and carry an error id.
    pub fn is_urgent(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }

    /// Case-insensitive parse used by the configuration surface.
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "fatal" | "critical" => Some(LogLevel::Fatal),
            _ => None,
        }
    }

    /// All levels in ascending severity order.
    pub fn all() -> [LogLevel; 6] {
        [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ]
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LogRecord is the unit of work flowing through the pipeline.
///
/// Immutable after stamping and sanitizing; destinations own it transiently
/// until delivered or discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub session_user: Option<String>,
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub client_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl LogRecord {
    /// Build a bare record stamped with the current instant.
    ///
    /// Ambient fields and the error id are attached by the dispatcher;
    /// message and context are expected to be sanitized before delivery.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        LogRecord {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            context: None,
            session_user: None,
            location: None,
            client_agent: None,
            error_id: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Generate a correlation identifier for error/fatal records.
///
/// Time-based prefix plus a random suffix so a displayed error can be
/// matched with its logged detail without the two ever colliding.
pub fn generate_error_id(stamp: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("err-{}-{}", stamp.timestamp_millis(), &suffix[..8])
}

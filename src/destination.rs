// destination.rs
// Purpose: Capability contract every log sink implements

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::errors::LogshipResult;
use crate::record::{LogLevel, LogRecord};

/// A named sink that accepts sanitized records and is responsible for
/// delivering or retaining them.
///
/// `deliver` is a hand-off: implementations buffer or write locally and must
/// not block the dispatcher on network completion. Destinations live for the
/// process lifetime and are flushed once at shutdown.
pub trait Destination: Send + Sync {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn min_level(&self) -> LogLevel;

    fn set_min_level(&self, level: LogLevel);

    /// Whether a record at `level` should reach this sink at all.
    fn accepts(&self, level: LogLevel) -> bool {
        self.enabled() && level >= self.min_level()
    }

    /// Accept a record for delivery. Errors are contained by the dispatcher;
    /// they never reach the calling application.
    fn deliver(&self, record: &LogRecord) -> LogshipResult<()>;

    /// Push out anything buffered. `synchronous` marks process teardown,
    /// where only a best-effort unobserved send may be available.
    fn flush(&self, synchronous: bool) {
        let _ = synchronous;
    }
}

/// Shared enable/min-level gating state embedded by the concrete sinks.
#[derive(Debug)]
pub struct DestinationGate {
    enabled: AtomicBool,
    min_level: RwLock<LogLevel>,
}

impl DestinationGate {
    pub fn new(min_level: LogLevel) -> Self {
        DestinationGate {
            enabled: AtomicBool::new(true),
            min_level: RwLock::new(min_level),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn min_level(&self) -> LogLevel {
        // Poison cannot realistically happen on a plain getter/setter pair;
        // degrade to the most permissive gate rather than panic.
        self.min_level
            .read()
            .map(|level| *level)
            .unwrap_or(LogLevel::Trace)
    }

    pub fn set_min_level(&self, level: LogLevel) {
        if let Ok(mut slot) = self.min_level.write() {
            *slot = level;
        }
    }
}

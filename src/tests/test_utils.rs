// src/tests/test_utils.rs
// Shared stubs for pipeline behavior tests

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::destination::{Destination, DestinationGate};
use crate::errors::{LogshipError, LogshipResult};
use crate::record::{LogLevel, LogRecord};
use crate::transport::{BatchPayload, LogTransport};

/// Transport stub recording every observed batch; fails the first
/// `fail_first` sends.
pub struct StubTransport {
    pub batches: Mutex<Vec<(Instant, Vec<LogRecord>)>>,
    pub fail_first: u32,
    attempts: AtomicU32,
    pub unobserved: AtomicU32,
}

impl StubTransport {
    pub fn new(fail_first: u32) -> Self {
        StubTransport {
            batches: Mutex::new(Vec::new()),
            fail_first,
            attempts: AtomicU32::new(0),
            unobserved: AtomicU32::new(0),
        }
    }

    /// Always-failing transport.
    pub fn failing() -> Self {
        StubTransport::new(u32::MAX)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Vec<LogRecord>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, logs)| logs.clone())
            .collect()
    }

    pub fn attempt_gaps(&self) -> Vec<Duration> {
        let batches = self.batches.lock().unwrap();
        batches
            .windows(2)
            .map(|pair| pair[1].0.duration_since(pair[0].0))
            .collect()
    }
}

impl LogTransport for StubTransport {
    fn send_batch(&self, payload: &BatchPayload) -> LogshipResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push((Instant::now(), payload.logs.clone()));
        if attempt < self.fail_first {
            Err(LogshipError::internal("stub transport failure"))
        } else {
            Ok(())
        }
    }

    fn send_unobserved(&self, payload: &BatchPayload) -> bool {
        self.unobserved.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push((Instant::now(), payload.logs.clone()));
        true
    }
}

/// Destination stub capturing delivered records; optionally sleeps to
/// simulate a slow sink or fails every delivery.
pub struct StubDestination {
    gate: DestinationGate,
    pub delivered: Mutex<Vec<LogRecord>>,
    pub delay: Option<Duration>,
    pub fail: AtomicBool,
}

impl StubDestination {
    pub fn new(min_level: LogLevel) -> Self {
        StubDestination {
            gate: DestinationGate::new(min_level),
            delivered: Mutex::new(Vec::new()),
            delay: None,
            fail: AtomicBool::new(false),
        }
    }

    pub fn slow(min_level: LogLevel, delay: Duration) -> Self {
        StubDestination {
            delay: Some(delay),
            ..StubDestination::new(min_level)
        }
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl Destination for StubDestination {
    fn name(&self) -> &str {
        "stub"
    }

    fn enabled(&self) -> bool {
        self.gate.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    fn min_level(&self) -> LogLevel {
        self.gate.min_level()
    }

    fn set_min_level(&self, level: LogLevel) {
        self.gate.set_min_level(level);
    }

    fn deliver(&self, record: &LogRecord) -> LogshipResult<()> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LogshipError::delivery("stub", "configured to fail"));
        }
        self.delivered.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Record factory for tests.
pub fn record(level: LogLevel, message: &str) -> LogRecord {
    LogRecord::new(level, message)
}

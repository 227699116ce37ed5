// dispatcher.rs
// Purpose: Central façade - stamp, sanitize, and fan out records to every sink

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::ambient::{AmbientContext, ProcessAmbient};
use crate::destination::Destination;
use crate::record::{generate_error_id, LogLevel, LogRecord};
use crate::sanitizer;

const FLUSH_ACK_TIMEOUT: Duration = Duration::from_secs(2);

enum DispatchMessage {
    Record(LogRecord),
    Flush {
        synchronous: bool,
        ack: mpsc::Sender<()>,
    },
}

/// The logging façade applications call.
///
/// A call stamps, sanitizes, and enqueues the record for a dedicated
/// dispatch thread, then returns; it never waits on destination delivery.
/// Records reach each destination in call order. Logging failures never
/// propagate to the caller: worst case is missing telemetry, surfaced on
/// the fallback channel.
#[derive(Clone)]
pub struct Logger {
    sender: mpsc::Sender<DispatchMessage>,
    destinations: Arc<Vec<Arc<dyn Destination>>>,
    ambient: Arc<dyn AmbientContext>,
}

impl Logger {
    pub fn new(destinations: Vec<Arc<dyn Destination>>) -> Self {
        Logger::with_ambient(destinations, Arc::new(ProcessAmbient))
    }

    pub fn with_ambient(
        destinations: Vec<Arc<dyn Destination>>,
        ambient: Arc<dyn AmbientContext>,
    ) -> Self {
        let destinations = Arc::new(destinations);
        let (sender, receiver) = mpsc::channel();

        let fanout = Arc::clone(&destinations);
        std::thread::Builder::new()
            .name("logship-dispatch".into())
            .spawn(move || dispatch_loop(receiver, fanout))
            .expect("spawn dispatch thread");

        Logger {
            sender,
            destinations,
            ambient,
        }
    }

    pub fn destinations(&self) -> &[Arc<dyn Destination>] {
        &self.destinations
    }

    pub fn trace(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Trace, message, context);
    }

    pub fn debug(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Debug, message, context);
    }

    pub fn info(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Info, message, context);
    }

    pub fn warn(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Warn, message, context);
    }

    pub fn error(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Error, message, context);
    }

    pub fn fatal(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Fatal, message, context);
    }

    /// Stamp, sanitize, and hand off one record.
    pub fn log(&self, level: LogLevel, message: &str, context: Option<Value>) {
        let record = self.build_record(level, message, context);
        if self.sender.send(DispatchMessage::Record(record)).is_err() {
            eprintln!("[logship] dispatch thread gone; record dropped");
        }
    }

    fn build_record(&self, level: LogLevel, message: &str, context: Option<Value>) -> LogRecord {
        let timestamp = Utc::now();
        let mut record = LogRecord::new(level, sanitizer::mask_str(message));
        record.timestamp = timestamp;
        record.context = context.map(|value| sanitizer::mask_value(&value));

        // Ambient fields are best-effort; a provider failure reads as
        // "field absent" and never aborts the call.
        record.session_user = ambient_field(|| self.ambient.session_user());
        record.location = ambient_field(|| self.ambient.location());
        record.client_agent = ambient_field(|| self.ambient.client_agent());

        if level.is_urgent() {
            record.error_id = Some(generate_error_id(timestamp));
        }

        record
    }

    /// Flush every destination after the queue drains. Blocks until the
    /// dispatch thread acknowledges (bounded), so callers get a
    /// synchronization point at shutdown; `synchronous` marks teardown.
    pub fn flush_all(&self, synchronous: bool) {
        let (ack, done) = mpsc::channel();
        if self
            .sender
            .send(DispatchMessage::Flush { synchronous, ack })
            .is_err()
        {
            return;
        }
        let _ = done.recv_timeout(FLUSH_ACK_TIMEOUT);
    }
}

fn ambient_field(read: impl FnOnce() -> Option<String>) -> Option<String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(read))
        .ok()
        .flatten()
}

/// Sequential fan-out keeps per-destination FIFO ordering. A destination
/// error is contained here: reported on the fallback channel, siblings
/// still get the record.
fn dispatch_loop(receiver: mpsc::Receiver<DispatchMessage>, destinations: Arc<Vec<Arc<dyn Destination>>>) {
    while let Ok(message) = receiver.recv() {
        match message {
            DispatchMessage::Record(record) => {
                for destination in destinations.iter() {
                    if !destination.accepts(record.level) {
                        continue;
                    }
                    if let Err(e) = destination.deliver(&record) {
                        eprintln!(
                            "[logship] destination '{}' delivery failed: {}",
                            destination.name(),
                            e
                        );
                        log::warn!(
                            "destination '{}' delivery failed: {}",
                            destination.name(),
                            e
                        );
                    }
                }
            }
            DispatchMessage::Flush { synchronous, ack } => {
                for destination in destinations.iter() {
                    destination.flush(synchronous);
                }
                let _ = ack.send(());
            }
        }
    }
}

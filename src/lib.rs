//! Library root for the `logship` crate
//!
//! A client-side structured logging pipeline: records are stamped and
//! PII-masked by the dispatcher, then fanned out to an interactive console,
//! a bounded durable local store, and a batched remote sender with retry.

// Core error handling
pub mod errors;

// Record model & sanitization
pub mod record;
pub mod sanitizer;

// Ambient context stamping
pub mod ambient;

// Destinations
pub mod console_destination;
pub mod destination;
pub mod durable_destination;
pub mod remote_destination;
pub mod transport;

// Dispatch façade
pub mod dispatcher;

// Configuration & composition
pub mod config_loader;
pub mod pipeline;


// Re-export the surface most callers need
pub use config_loader::{load_config, PipelineConfig, Profile};
pub use destination::Destination;
pub use dispatcher::Logger;
pub use errors::{LogshipError, LogshipResult};
pub use pipeline::LogPipeline;
pub use record::{LogLevel, LogRecord};

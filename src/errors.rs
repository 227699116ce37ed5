//! Error handling for the logship pipeline
//!
//! One structured error type covers every failure domain the pipeline can
//! hit. Callers of the public logging surface never see these errors; they
//! are contained per destination and only visible on the fallback channel.

use thiserror::Error;

/// Main error type for the logship pipeline
#[derive(Error, Debug)]
pub enum LogshipError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store operation failed: {operation} - {source}")]
    Store {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Network operation failed: {operation}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote endpoint rejected batch: HTTP {status}")]
    RemoteStatus { status: u16 },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Mutex lock failed: {resource}")]
    MutexPoisoned { resource: String },

    #[error("Destination '{destination}' delivery failed: {message}")]
    Delivery {
        destination: String,
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Result with LogshipError
pub type LogshipResult<T> = Result<T, LogshipError>;

impl LogshipError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a delivery error
    pub fn delivery(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Helper trait for safe mutex operations
pub trait SafeLock<T: ?Sized> {
    /// Safely lock a mutex, returning a LogshipError on poison
    fn safe_lock(&self) -> LogshipResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self) -> LogshipResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| LogshipError::MutexPoisoned {
            resource: "generic_mutex".to_string(),
        })
    }
}

/// Helper trait for safe RwLock read operations
pub trait SafeReadLock<T: ?Sized> {
    /// Safely acquire a read lock
    fn safe_read(&self) -> LogshipResult<std::sync::RwLockReadGuard<'_, T>>;
}

impl<T: ?Sized> SafeReadLock<T> for std::sync::RwLock<T> {
    fn safe_read(&self) -> LogshipResult<std::sync::RwLockReadGuard<'_, T>> {
        self.read().map_err(|_| LogshipError::MutexPoisoned {
            resource: "rwlock_read".to_string(),
        })
    }
}

/// Helper trait for safe RwLock write operations
pub trait SafeWriteLock<T: ?Sized> {
    /// Safely acquire a write lock
    fn safe_write(&self) -> LogshipResult<std::sync::RwLockWriteGuard<'_, T>>;
}

impl<T: ?Sized> SafeWriteLock<T> for std::sync::RwLock<T> {
    fn safe_write(&self) -> LogshipResult<std::sync::RwLockWriteGuard<'_, T>> {
        self.write().map_err(|_| LogshipError::MutexPoisoned {
            resource: "rwlock_write".to_string(),
        })
    }
}

// pipeline.rs
// Purpose: Composition root - wire destinations per profile, expose the logger

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};

use crate::config_loader::PipelineConfig;
use crate::console_destination::ConsoleDestination;
use crate::destination::Destination;
use crate::dispatcher::Logger;
use crate::durable_destination::DurableDestination;
use crate::errors::{LogshipError, LogshipResult};
use crate::record::LogRecord;
use crate::remote_destination::{RemoteConfig, RemoteDestination};
use crate::transport::HttpTransport;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the default destination set and the logger façade.
///
/// Constructed once at process start; destinations live for the process
/// lifetime and are flushed by `shutdown`.
pub struct LogPipeline {
    logger: Logger,
    durable: Arc<DurableDestination>,
    remote: Option<Arc<RemoteDestination>>,
    // Keeps a private runtime alive when the host process does not run one.
    _runtime: Option<Runtime>,
}

impl LogPipeline {
    pub fn new(config: PipelineConfig) -> LogshipResult<Self> {
        config.validate()?;

        let (handle, runtime) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                    .map_err(|e| LogshipError::io("build pipeline runtime", e))?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        let min_level = config.min_enabled_level()?;

        let console = Arc::new(ConsoleDestination::new(min_level, config.verbose_console()));

        let data_dir = resolve_data_dir(&config)?;
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| LogshipError::io("create data directory", e))?;
        let durable = Arc::new(DurableDestination::new(
            min_level,
            &data_dir,
            config.max_buffer_size,
        ));

        let remote = if config.remote_enabled {
            // validate() guarantees the endpoint is present here.
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| LogshipError::config("remote endpoint missing"))?;
            let headers = config
                .auth_headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            let transport = Arc::new(HttpTransport::new(endpoint, headers, HTTP_TIMEOUT));
            Some(Arc::new(RemoteDestination::new(
                min_level,
                RemoteConfig {
                    batch_size: config.batch_size,
                    flush_interval: Duration::from_millis(config.flush_interval_ms),
                    max_retries: config.max_retries,
                    retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
                },
                transport,
                handle,
            )))
        } else {
            None
        };

        let mut destinations: Vec<Arc<dyn Destination>> = vec![
            console as Arc<dyn Destination>,
            Arc::clone(&durable) as Arc<dyn Destination>,
        ];
        if let Some(remote) = &remote {
            destinations.push(Arc::clone(remote) as Arc<dyn Destination>);
        }

        Ok(LogPipeline {
            logger: Logger::new(destinations),
            durable,
            remote,
            _runtime: runtime,
        })
    }

    /// Load configuration from file/env and build the default pipeline.
    pub fn from_env() -> LogshipResult<Self> {
        LogPipeline::new(crate::config_loader::load_config()?)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn remote(&self) -> Option<&Arc<RemoteDestination>> {
        self.remote.as_ref()
    }

    /// Diagnostics read-back from the durable store (insertion order).
    pub fn stored_logs(&self) -> Vec<LogRecord> {
        self.durable.stored_logs()
    }

    /// Empty the durable store.
    pub fn clear_stored(&self) {
        self.durable.clear_stored()
    }

    /// Flush every destination on the teardown path. Buffered remote
    /// records go out fire-and-forget rather than being lost.
    pub fn shutdown(&self) {
        self.logger.flush_all(true);
    }
}

fn resolve_data_dir(config: &PipelineConfig) -> LogshipResult<PathBuf> {
    if let Some(dir) = &config.data_dir {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("logship"))
        .ok_or_else(|| LogshipError::config("no data directory available; set data_dir"))
}

// config_loader.rs
// Purpose: Configuration surface for the pipeline, resolved once at startup

use std::collections::BTreeMap;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::errors::{LogshipError, LogshipResult};
use crate::record::LogLevel;

/// Runtime profile; controls default level set and console verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_profile")]
    pub profile: Profile,
    /// Accepted level names (case-insensitive). Empty means "use the
    /// profile default": all six in development, info and above in
    /// production.
    #[serde(default)]
    pub enabled_levels: Vec<String>,
    #[serde(default)]
    pub remote_enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static headers attached to every batch POST (auth tokens and the
    /// like), supplied at construction and never logged.
    #[serde(default)]
    pub auth_headers: BTreeMap<String, String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Capacity of the durable local store.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
    /// Durable store location; platform data-local dir when unset.
    #[serde(default)]
    pub data_dir: Option<String>,
}

fn default_profile() -> Profile {
    Profile::Development
}

fn default_batch_size() -> usize {
    10
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_buffer_size() -> usize {
    crate::durable_destination::DEFAULT_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            profile: default_profile(),
            enabled_levels: Vec::new(),
            remote_enabled: false,
            endpoint: None,
            auth_headers: BTreeMap::new(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_buffer_size: default_max_buffer_size(),
            data_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Lowest severity accepted by the pipeline under this configuration.
    pub fn min_enabled_level(&self) -> LogshipResult<LogLevel> {
        if self.enabled_levels.is_empty() {
            return Ok(match self.profile {
                Profile::Development => LogLevel::Trace,
                Profile::Production => LogLevel::Info,
            });
        }

        let mut min = None;
        for name in &self.enabled_levels {
            let level = LogLevel::parse(name)
                .ok_or_else(|| LogshipError::config(format!("unknown log level '{}'", name)))?;
            min = Some(match min {
                Some(current) if current < level => current,
                _ => level,
            });
        }
        // Non-empty vec always produced a value above.
        min.ok_or_else(|| LogshipError::internal("level set resolution"))
    }

    /// Whether the console should use verbose colored formatting.
    pub fn verbose_console(&self) -> bool {
        self.profile == Profile::Development
    }

    /// Construction-time validation; a bad configuration surfaces here,
    /// once, never per log call.
    pub fn validate(&self) -> LogshipResult<()> {
        if self.remote_enabled && self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(LogshipError::config(
                "remote destination enabled but no endpoint configured",
            ));
        }
        if self.batch_size == 0 {
            return Err(LogshipError::config("batch_size must be at least 1"));
        }
        if self.max_buffer_size == 0 {
            return Err(LogshipError::config("max_buffer_size must be at least 1"));
        }
        self.min_enabled_level()?;
        Ok(())
    }
}

/// Load configuration: serialized defaults, then `logship.toml`, then
/// `LOGSHIP_`-prefixed environment variables.
pub fn load_config() -> LogshipResult<PipelineConfig> {
    let figment = Figment::from(Serialized::defaults(PipelineConfig::default()))
        .merge(Toml::file("logship.toml"))
        .merge(Env::prefixed("LOGSHIP_"));

    let config: PipelineConfig = figment
        .extract()
        .map_err(|e| LogshipError::config(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

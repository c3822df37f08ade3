//! YAML configuration (`spec.md` §6), loaded with `serde_yaml` the way
//! several example repos in the retrieval pack load their own YAML
//! configuration (see `DESIGN.md`).

use std::path::Path;

use serde::Deserialize;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rabbitmq_host: String,
    pub rabbitmq_user: String,
    pub rabbitmq_password: String,
    pub consumer_bindings: ConsumerBindings,
    pub refresh_time: i64,
    pub manifest_size: usize,
    pub cooldown_time: i64,
    pub active_time: i64,
    pub publish_exchange: String,
    pub publish_key: String,
}

/// The `consumer_bindings` sub-document.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerBindings {
    pub exchange: String,
    pub input_queue: String,
    pub keys: Vec<String>,
    pub queue_size: u32,
}

impl Config {
    /// Loads and parses the YAML document at `path`. A malformed or
    /// missing config is a startup error -- it happens before any engine
    /// state exists, so it is reported and the process exits immediately
    /// rather than routed through [`crate::error::EngineError`].
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

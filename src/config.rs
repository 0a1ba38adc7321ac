//! Configuration loading.
//!
//! Mirrors the teacher's `config::Config` + global-`OnceCell` pattern, but
//! deserializes into a typed [`AppConfig`] up front so the rest of the crate
//! never has to guess a key name or unwrap a missing section at the call
//! site. Source document is `config.toml` (TOML, via the `config` crate),
//! covering the same settings the original indexer's YAML config carried:
//! server bind address, log level, store directory, node RPC credentials,
//! and the batching knobs (`batch_size`, `block_chan_buf`).

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::error::Error;

static GLOBAL_CONFIG: OnceCell<AppConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    pub store: StoreConfig,
    pub rpc: RpcConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Threshold on len(vins) + len(vouts) accumulated by the Storer before
    /// a non-catch-up flush is triggered.
    pub batch_size: usize,
    /// Capacity of the bounded Scanner -> Storer channel.
    pub block_chan_buf: usize,
}

/// Load and parse `config.toml`, storing the result in the process-global
/// slot. Call once at startup, before any module reaches for
/// [`get_global_config`].
pub fn init_global_config() -> Result<(), Box<dyn Error>> {
    let cfg = load_config()?;
    GLOBAL_CONFIG
        .set(cfg)
        .map_err(|_| "config already initialized")?;
    Ok(())
}

/// Fetch the process-global config. Panics with a clear message if
/// [`init_global_config`] was never called — this mirrors the teacher's
/// fail-fast behavior for a config accessed before startup wiring completes.
pub fn get_global_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get().unwrap_or_else(|| {
        tracing::error!("config not initialized - call init_global_config() first");
        std::process::exit(1);
    })
}

/// Load config independent of the global slot, for tests and standalone
/// tooling.
pub fn load_config() -> Result<AppConfig, Box<dyn Error>> {
    let raw = config::Config::builder()
        .add_source(config::File::with_name("config.toml"))
        .build()?;
    let cfg: AppConfig = raw.try_deserialize()?;
    Ok(cfg)
}

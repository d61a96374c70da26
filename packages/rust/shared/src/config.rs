//! Application configuration for trackalt.
//!
//! User config lives at `~/.trackalt/trackalt.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TrackAltError};
use crate::types::InjectionMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trackalt.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trackalt";

/// Default elevation service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/elevation/json";

// ---------------------------------------------------------------------------
// Config structs (matching trackalt.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Elevation service settings.
    #[serde(default)]
    pub elevation: ElevationConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[elevation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationConfig {
    /// Lookup endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum points per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch before the run is aborted.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay; attempt `n` waits `n * retry_base_delay_ms`.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Pause between successive batches.
    #[serde(default = "default_batch_pause")]
    pub batch_pause_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            batch_pause_ms: default_batch_pause(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_api_key_env() -> String {
    "ELEVATION_API_KEY".into()
}
fn default_batch_size() -> usize {
    100
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay() -> u64 {
    1000
}
fn default_batch_pause() -> u64 {
    150
}
fn default_request_timeout() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// How altitude is written onto trackpoints.
    #[serde(default)]
    pub mode: InjectionMode,

    /// Suffix appended to the input file stem for derived output names.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Whether to write the structured point list next to the track.
    #[serde(default = "default_true")]
    pub write_points: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: InjectionMode::default(),
            suffix: default_suffix(),
            write_points: true,
        }
    }
}

fn default_suffix() -> String {
    "_ele".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime elevation lookup configuration. Holds the resolved credential.
#[derive(Clone)]
pub struct FetchConfig {
    /// Lookup endpoint.
    pub endpoint: Url,
    /// Service credential, sent as the `key` query parameter.
    pub api_key: String,
    /// Maximum points per request (at least 1).
    pub batch_size: usize,
    /// Attempts per batch (at least 1).
    pub max_attempts: u32,
    /// Base delay for linear backoff between attempts.
    pub retry_base_delay: Duration,
    /// Pause between successive batches.
    pub batch_pause: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("batch_size", &self.batch_size)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("batch_pause", &self.batch_pause)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl FetchConfig {
    /// Build a runtime config from the `[elevation]` section and a resolved key.
    pub fn from_config(config: &ElevationConfig, api_key: String) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            TrackAltError::config(format!("invalid endpoint '{}': {e}", config.endpoint))
        })?;

        let fetch = Self {
            endpoint,
            api_key,
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        };
        fetch.validate()?;
        Ok(fetch)
    }

    /// Reject settings the fetcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TrackAltError::config("batch_size must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(TrackAltError::config("max_attempts must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(TrackAltError::config("request_timeout_secs must be at least 1"));
        }
        if self.api_key.is_empty() {
            return Err(TrackAltError::config("api key must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trackalt/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrackAltError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trackalt/trackalt.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrackAltError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TrackAltError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TrackAltError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TrackAltError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TrackAltError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the service credential: an explicit value wins, then the env var
/// named in `[elevation].api_key_env`. Fails before any network activity.
pub fn resolve_api_key(explicit: Option<&str>, config: &AppConfig) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    let var_name = &config.elevation.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(TrackAltError::MissingCredential {
            env_var: var_name.clone(),
        }),
    }
}

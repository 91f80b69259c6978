//! Configuration structures for Dynavoice.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from dynavoice.toml)
//! - User overrides (~/.config/dynavoice/dynavoice.toml or ./dynavoice.toml)
//! - Environment overrides (`DYNAVOICE_<SECTION>__<KEY>`)
//! - Automatic merging with later sources taking precedence

use config::{Config, Environment, File, FileFormat};
use dynavoice_error::{ConfigError, DynavoiceError, DynavoiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../dynavoice.toml");

/// Timing of the lifecycle controller.
///
/// ```toml
/// [lifecycle]
/// rename_debounce_ms = 10_000
/// spawn_coalesce_ms = 1_500
/// join_request_timeout_secs = 60
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// Quiet interval before a queued rename job runs
    pub rename_debounce_ms: u64,

    /// Window in which joins into a primary reuse the secondary just spawned from it
    pub spawn_coalesce_ms: u64,

    /// How long a join request waits for the owner's answer
    pub join_request_timeout_secs: u64,
}

impl LifecycleConfig {
    /// Debounce interval as a duration.
    pub fn rename_debounce(&self) -> Duration {
        Duration::from_millis(self.rename_debounce_ms)
    }

    /// Spawn coalescing window as a duration.
    pub fn spawn_coalesce(&self) -> Duration {
        Duration::from_millis(self.spawn_coalesce_ms)
    }

    /// Join request timeout as a duration.
    pub fn join_request_timeout(&self) -> Duration {
        Duration::from_secs(self.join_request_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            rename_debounce_ms: 10_000,
            spawn_coalesce_ms: 1_500,
            join_request_timeout_secs: 60,
        }
    }
}

/// Bounds for every platform and persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallConfig {
    /// Per-attempt timeout
    pub timeout_ms: u64,

    /// First backoff delay
    pub initial_backoff_ms: u64,

    /// Retries after the first attempt
    pub max_retries: usize,

    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            initial_backoff_ms: 500,
            max_retries: 3,
            max_delay_ms: 30_000,
        }
    }
}

/// Per-channel rename quota.
///
/// ```toml
/// [rename_quota]
/// burst = 2
/// period_secs = 600
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenameQuotaConfig {
    /// Renames allowed back to back
    pub burst: u32,

    /// Period in which `burst` renames replenish
    pub period_secs: u64,
}

/// Top-level Dynavoice configuration.
///
/// # Example
///
/// ```no_run
/// use dynavoice_rate_limit::DynavoiceConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DynavoiceConfig::load()?;
/// println!("rename debounce: {:?}", config.lifecycle.rename_debounce());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct DynavoiceConfig {
    /// Lifecycle timing
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Call bounds
    #[serde(default)]
    pub calls: CallConfig,

    /// Rename quota, disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_quota: Option<RenameQuotaConfig>,
}

impl DynavoiceConfig {
    /// Parse configuration from a TOML string layered over nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid configuration.
    pub fn from_toml(toml: &str) -> DynavoiceResult<Self> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DynavoiceResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                DynavoiceError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                DynavoiceError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> DynavoiceResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/dynavoice/dynavoice.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("dynavoice").required(false))
            .add_source(
                Environment::with_prefix("DYNAVOICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> DynavoiceResult<Self> {
        builder
            .build()
            .map_err(|e| {
                DynavoiceError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                DynavoiceError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// The bundled defaults without any user overrides.
    pub fn bundled() -> DynavoiceResult<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }
}

//! Configuration for cdn-harness.
//!
//! Environment variables are read once into [`EnvConfig`]; an optional
//! `cdn-harness.config.yml` file adds harness settings on top. Components
//! receive explicit config values and never read the environment themselves.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::adapters::outbound::network::RetryPolicy;
use crate::cdn_protocol::{IntegerEntries, ProtocolVersion, Specifier};
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "cdn-harness.config.yml";

/// Root address of the CDN under test
pub const CDN_ROOT_ENV: &str = "CDN_ROOT";
/// Port the spawned server listens on
pub const PORT_ENV: &str = "PORT";
/// Protocol version used for versioned endpoints
pub const PROTOCOL_VERSION_ENV: &str = "CDN_PROTOCOL_VERSION";
/// Total attempts per CDN request
pub const RETRY_ATTEMPTS_ENV: &str = "CDN_RETRY_ATTEMPTS";
/// Milliseconds between attempts
pub const RETRY_DELAY_MS_ENV: &str = "CDN_RETRY_DELAY_MS";
/// How integer file entries in `/package` responses are read
pub const INTEGER_ENTRIES_ENV: &str = "CDN_INTEGER_ENTRIES";

pub const DEFAULT_CDN_ROOT: &str = "http://localhost:8080";
pub const DEFAULT_PORT: u16 = 9000;

/// Values taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub cdn_root: Option<String>,
    pub port: Option<u16>,
    pub protocol_version: Option<ProtocolVersion>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub integer_entries: Option<IntegerEntries>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty(PORT_ENV) {
            Some(raw) => Some(raw.trim().parse::<u16>().with_context(|| {
                format!(
                    "Invalid {} value: '{}'\n\n💡 Hint: Use a port number between 0 and 65535",
                    PORT_ENV, raw
                )
            })?),
            None => None,
        };

        let retry_attempts = match non_empty(RETRY_ATTEMPTS_ENV) {
            Some(raw) => Some(raw.trim().parse::<u32>().with_context(|| {
                format!("Invalid {} value: '{}'", RETRY_ATTEMPTS_ENV, raw)
            })?),
            None => None,
        };

        let retry_delay_ms = match non_empty(RETRY_DELAY_MS_ENV) {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                format!("Invalid {} value: '{}'", RETRY_DELAY_MS_ENV, raw)
            })?),
            None => None,
        };

        let protocol_version = match non_empty(PROTOCOL_VERSION_ENV) {
            Some(raw) => Some(
                raw.parse::<ProtocolVersion>()
                    .map_err(|e| anyhow::anyhow!("Invalid {} value: {}", PROTOCOL_VERSION_ENV, e))?,
            ),
            None => None,
        };

        let integer_entries = match non_empty(INTEGER_ENTRIES_ENV) {
            Some(raw) => Some(
                raw.parse::<IntegerEntries>()
                    .map_err(|e| anyhow::anyhow!("Invalid {} value: {}", INTEGER_ENTRIES_ENV, e))?,
            ),
            None => None,
        };

        Ok(Self {
            cdn_root: non_empty(CDN_ROOT_ENV),
            port,
            protocol_version,
            retry_attempts,
            retry_delay_ms,
            integer_entries,
        })
    }
}

/// Everything a [`CdnClient`](crate::adapters::outbound::network::CdnClient) needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    /// Base address, e.g. `http://localhost:8080`
    pub root: String,
    pub protocol_version: ProtocolVersion,
    pub retry: RetryPolicy,
    pub integer_entries: IntegerEntries,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_CDN_ROOT.to_string(),
            protocol_version: ProtocolVersion::LATEST,
            retry: RetryPolicy::default(),
            integer_entries: IntegerEntries::default(),
        }
    }
}

impl CdnConfig {
    pub fn from_env_config(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        Self {
            root: env.cdn_root.clone().unwrap_or(defaults.root),
            protocol_version: env.protocol_version.unwrap_or(defaults.protocol_version),
            retry: RetryPolicy::new(
                env.retry_attempts.unwrap_or(defaults.retry.max_attempts),
                env.retry_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.retry_delay),
            ),
            integer_entries: env.integer_entries.unwrap_or(defaults.integer_entries),
        }
    }
}

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub server_bin: Option<String>,
    pub server_args: Option<Vec<String>>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub readiness_attempts: Option<u32>,
    pub readiness_interval_ms: Option<u64>,
    pub test_command: Option<Vec<String>>,
    pub protocol_version: Option<String>,
    pub retry: Option<RetrySection>,
    /// `back-reference` or `size`, see [`IntegerEntries`]
    pub integer_entries: Option<String>,
    /// `name@range` requested by the readiness check
    pub probe_specifier: Option<String>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// `retry:` section of the config file.
#[derive(Debug, Deserialize, Default)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl ConfigFile {
    /// Variables to hand to the test runner so its client picks up the
    /// configured protocol version and retry policy.
    pub fn runner_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(ref version) = self.protocol_version {
            env.push((PROTOCOL_VERSION_ENV.to_string(), version.clone()));
        }
        if let Some(ref retry) = self.retry {
            if let Some(attempts) = retry.max_attempts {
                env.push((RETRY_ATTEMPTS_ENV.to_string(), attempts.to_string()));
            }
            if let Some(delay) = retry.retry_delay_ms {
                env.push((RETRY_DELAY_MS_ENV.to_string(), delay.to_string()));
            }
        }
        if let Some(ref mode) = self.integer_entries {
            env.push((INTEGER_ENTRIES_ENV.to_string(), mode.clone()));
        }
        env
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.readiness_attempts == Some(0) {
        bail!(
            "Invalid config: readiness_attempts must be at least 1.\n\n\
             💡 Hint: The server is probed this many times before the run is aborted."
        );
    }
    if let Some(ref command) = config.test_command {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            bail!(
                "Invalid config: test_command must not be empty.\n\n\
                 💡 Hint: Specify the program and its arguments, e.g. [\"cargo\", \"test\"]."
            );
        }
    }
    if let Some(ref version) = config.protocol_version {
        version
            .parse::<ProtocolVersion>()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    }
    if let Some(ref mode) = config.integer_entries {
        mode.parse::<IntegerEntries>()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    }
    if let Some(ref specifier) = config.probe_specifier {
        specifier
            .parse::<Specifier>()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    }
    Ok(())
}

fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}

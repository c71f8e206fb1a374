use crate::adapters::outbound::process::ProcessSpec;
use crate::cdn_protocol::Specifier;
use crate::config::{CDN_ROOT_ENV, DEFAULT_PORT, PORT_ENV};
use crate::shared::Result;
use std::time::Duration;

/// HarnessSettings - everything one harness run needs, resolved up front
///
/// Built once from CLI arguments, the config file and the environment, then
/// handed to the use case; nothing downstream reads the environment again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    /// CDN server binary to spawn
    pub server_bin: String,
    pub server_args: Vec<String>,
    /// Host the server is reached at
    pub host: String,
    /// Port injected into the server's environment
    pub port: u16,
    pub readiness_attempts: u32,
    pub readiness_interval: Duration,
    /// Test runner program followed by its arguments
    pub test_command: Vec<String>,
    /// Extra variables for the test runner, on top of `CDN_ROOT`
    pub runner_env: Vec<(String, String)>,
    /// Module requested by the readiness check; `None` keeps the probe's default
    pub probe_specifier: Option<Specifier>,
}

impl HarnessSettings {
    pub const DEFAULT_SERVER_BIN: &'static str = "target/release/sandpack-cdn";
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_READINESS_ATTEMPTS: u32 = 25;
    pub const DEFAULT_READINESS_INTERVAL: Duration = Duration::from_millis(50);

    /// Runs the live contract suite, including its ignored-by-default tests
    pub fn default_test_command() -> Vec<String> {
        ["cargo", "test", "--test", "cdn_contract", "--", "--include-ignored"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn builder() -> HarnessSettingsBuilder {
        HarnessSettingsBuilder::default()
    }

    /// Root address of the spawned server, e.g. `http://localhost:9000`
    pub fn server_address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Server process: configured binary plus `PORT`, detached from the
    /// terminal's stdin
    pub fn server_spec(&self) -> ProcessSpec {
        ProcessSpec::new("server", self.server_bin.clone())
            .args(self.server_args.iter().cloned())
            .env(PORT_ENV, self.port.to_string())
            .stdin_null()
    }

    /// Test runner process: configured command plus `CDN_ROOT`
    pub fn runner_spec(&self) -> ProcessSpec {
        let mut parts = self.test_command.iter().cloned();
        let program = parts.next().unwrap_or_default();
        let mut spec = ProcessSpec::new("test runner", program)
            .args(parts)
            .env(CDN_ROOT_ENV, self.server_address());
        for (key, value) in &self.runner_env {
            spec = spec.env(key.clone(), value.clone());
        }
        spec
    }
}

/// Builder for [`HarnessSettings`]; unset fields fall back to defaults.
#[derive(Debug, Default)]
pub struct HarnessSettingsBuilder {
    server_bin: Option<String>,
    server_args: Vec<String>,
    host: Option<String>,
    port: Option<u16>,
    readiness_attempts: Option<u32>,
    readiness_interval: Option<Duration>,
    test_command: Option<Vec<String>>,
    runner_env: Vec<(String, String)>,
    probe_specifier: Option<Specifier>,
}

impl HarnessSettingsBuilder {
    pub fn server_bin(mut self, server_bin: impl Into<String>) -> Self {
        self.server_bin = Some(server_bin.into());
        self
    }

    pub fn server_args(mut self, args: Vec<String>) -> Self {
        self.server_args = args;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn readiness_attempts(mut self, attempts: u32) -> Self {
        self.readiness_attempts = Some(attempts);
        self
    }

    pub fn readiness_interval(mut self, interval: Duration) -> Self {
        self.readiness_interval = Some(interval);
        self
    }

    pub fn test_command(mut self, command: Vec<String>) -> Self {
        self.test_command = Some(command);
        self
    }

    pub fn runner_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.runner_env.push((key.into(), value.into()));
        self
    }

    pub fn probe_specifier(mut self, specifier: Specifier) -> Self {
        self.probe_specifier = Some(specifier);
        self
    }

    pub fn build(self) -> Result<HarnessSettings> {
        let readiness_attempts = self
            .readiness_attempts
            .unwrap_or(HarnessSettings::DEFAULT_READINESS_ATTEMPTS);
        if readiness_attempts == 0 {
            anyhow::bail!("Validation error: readiness attempts must be at least 1");
        }

        let test_command = self
            .test_command
            .unwrap_or_else(HarnessSettings::default_test_command);
        if test_command.first().map_or(true, |p| p.trim().is_empty()) {
            anyhow::bail!("Validation error: test command must not be empty");
        }

        let server_bin = self
            .server_bin
            .unwrap_or_else(|| HarnessSettings::DEFAULT_SERVER_BIN.to_string());
        if server_bin.trim().is_empty() {
            anyhow::bail!("Validation error: server binary must not be empty");
        }

        Ok(HarnessSettings {
            server_bin,
            server_args: self.server_args,
            host: self
                .host
                .unwrap_or_else(|| HarnessSettings::DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            readiness_attempts,
            readiness_interval: self
                .readiness_interval
                .unwrap_or(HarnessSettings::DEFAULT_READINESS_INTERVAL),
            test_command,
            runner_env: self.runner_env,
            probe_specifier: self.probe_specifier,
        })
    }
}

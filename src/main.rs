mod cli;

use cdn_harness::adapters::outbound::console::StderrProgressReporter;
use cdn_harness::adapters::outbound::network::CdnReadinessProbe;
use cdn_harness::application::dto::HarnessSettings;
use cdn_harness::application::use_cases::RunHarnessUseCase;
use cdn_harness::cdn_protocol::{Specifier, VersionedRequest};
use cdn_harness::config::{discover_config, load_config_from_path, ConfigFile, EnvConfig};
use cdn_harness::shared::error::ExitCode;
use cdn_harness::shared::Result;
use cli::Args;
use std::path::Path;
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("\n❌ An error occurred:\n");
        eprintln!("{}", e);

        // Display error chain
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("\nCaused by: {}", err);
            source = err.source();
        }

        eprintln!();
        process::exit(ExitCode::Failure.as_i32());
    }
}

async fn run() -> Result<()> {
    // Parse command-line arguments (exits with InvalidArguments on bad input)
    let args = Args::parse_args();

    if let Some(ref token) = args.decode_token {
        let request = VersionedRequest::from_token(token)?;
        println!("{} {}", request.version, request.payload);
        return Ok(());
    }

    // Environment is read exactly once
    let env = EnvConfig::from_env()?;

    let file_config = match args.config.as_deref() {
        Some(path) => load_config_from_path(Path::new(path))?,
        None => discover_config(&std::env::current_dir()?)?.unwrap_or_default(),
    };

    let settings = build_settings(args, file_config, &env)?;

    // Create adapters (Dependency Injection)
    let address = settings.server_address();
    let probe = match settings.probe_specifier.clone() {
        Some(specifier) => CdnReadinessProbe::with_specifier(&address, specifier)?,
        None => CdnReadinessProbe::new(&address)?,
    };
    let reporter = StderrProgressReporter::new();

    let mut use_case = RunHarnessUseCase::new(settings, probe, reporter);
    use_case.execute().await?;

    Ok(())
}

/// Resolves settings with precedence CLI > config file > environment > defaults.
fn build_settings(args: Args, file: ConfigFile, env: &EnvConfig) -> Result<HarnessSettings> {
    let runner_env = file.runner_env();
    let mut builder = HarnessSettings::builder();

    if let Some(server_bin) = args.server_bin.or(file.server_bin) {
        builder = builder.server_bin(server_bin);
    }

    let server_args = if args.server_args.is_empty() {
        file.server_args.unwrap_or_default()
    } else {
        args.server_args
    };
    builder = builder.server_args(server_args);

    if let Some(host) = args.host.or(file.host) {
        builder = builder.host(host);
    }
    if let Some(port) = args.port.or(file.port).or(env.port) {
        builder = builder.port(port);
    }
    if let Some(attempts) = args.readiness_attempts.or(file.readiness_attempts) {
        builder = builder.readiness_attempts(attempts);
    }
    if let Some(interval) = args.readiness_interval_ms.or(file.readiness_interval_ms) {
        builder = builder.readiness_interval(Duration::from_millis(interval));
    }

    let test_command = if args.test_command.is_empty() {
        file.test_command
    } else {
        Some(args.test_command)
    };
    if let Some(command) = test_command {
        builder = builder.test_command(command);
    }

    let probe_specifier = match (args.probe_specifier, file.probe_specifier) {
        (Some(specifier), _) => Some(specifier),
        (None, Some(raw)) => Some(raw.parse::<Specifier>()?),
        (None, None) => None,
    };
    if let Some(specifier) = probe_specifier {
        builder = builder.probe_specifier(specifier);
    }

    for (key, value) in runner_env {
        builder = builder.runner_env(key, value);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_build_settings_defaults() {
        let args = Args::parse_from(["cdn-harness"]);
        let settings = build_settings(args, ConfigFile::default(), &EnvConfig::default()).unwrap();
        assert_eq!(settings, HarnessSettings::builder().build().unwrap());
    }

    #[test]
    fn test_build_settings_env_port() {
        let args = Args::parse_from(["cdn-harness"]);
        let env = EnvConfig {
            port: Some(9400),
            ..EnvConfig::default()
        };
        let settings = build_settings(args, ConfigFile::default(), &env).unwrap();
        assert_eq!(settings.port, 9400);
    }

    #[test]
    fn test_build_settings_precedence() {
        let args = Args::parse_from(["cdn-harness", "--port", "9300", "--", "true"]);
        let file = ConfigFile {
            port: Some(9200),
            host: Some("127.0.0.1".to_string()),
            readiness_attempts: Some(7),
            test_command: Some(vec!["false".to_string()]),
            protocol_version: Some("1".to_string()),
            ..ConfigFile::default()
        };
        let env = EnvConfig {
            port: Some(9100),
            ..EnvConfig::default()
        };

        let settings = build_settings(args, file, &env).unwrap();
        assert_eq!(settings.port, 9300);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.readiness_attempts, 7);
        assert_eq!(settings.test_command, vec!["true".to_string()]);
        assert_eq!(
            settings.runner_env,
            vec![("CDN_PROTOCOL_VERSION".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_build_settings_readiness_specifier_precedence() {
        let file = || ConfigFile {
            probe_specifier: Some("react@18.2.0".to_string()),
            ..ConfigFile::default()
        };

        let args = Args::parse_from(["cdn-harness"]);
        let settings = build_settings(args, file(), &EnvConfig::default()).unwrap();
        assert_eq!(
            settings.probe_specifier,
            Some(Specifier::new("react", "18.2.0"))
        );

        let args = Args::parse_from(["cdn-harness", "--probe-specifier", "preact@10.11.0"]);
        let settings = build_settings(args, file(), &EnvConfig::default()).unwrap();
        assert_eq!(
            settings.probe_specifier,
            Some(Specifier::new("preact", "10.11.0"))
        );
    }
}

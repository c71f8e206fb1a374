use cdn_harness::cdn_protocol::Specifier;
use cdn_harness::shared::error::ExitCode;
use clap::Parser;

/// Boot a CDN server, wait until it answers, and run the test suite against it
#[derive(Parser, Debug)]
#[command(name = "cdn-harness")]
#[command(version)]
#[command(about = "Run the CDN integration tests against a freshly spawned server", long_about = None)]
pub struct Args {
    /// Server binary to spawn [default: target/release/sandpack-cdn]
    #[arg(short = 's', long)]
    pub server_bin: Option<String>,

    /// Extra argument passed to the server (repeatable)
    #[arg(long = "server-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Host the server is reached at [default: localhost]
    #[arg(long)]
    pub host: Option<String>,

    /// Port injected into the server as PORT [default: $PORT or 9000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Readiness probes before giving up [default: 25]
    #[arg(long, value_name = "N")]
    pub readiness_attempts: Option<u32>,

    /// Milliseconds between readiness probes [default: 50]
    #[arg(long, value_name = "MS")]
    pub readiness_interval_ms: Option<u64>,

    /// Module the readiness check requests, as name@range [default: react-dom@18.1.0]
    #[arg(long, value_name = "SPECIFIER")]
    pub probe_specifier: Option<Specifier>,

    /// Print the protocol version and payload of a request token, then exit
    #[arg(long, value_name = "TOKEN")]
    pub decode_token: Option<String>,

    /// Path to a config file (defaults to ./cdn-harness.config.yml if present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Test command to run once the server is ready
    /// [default: cargo test --test cdn_contract -- --include-ignored]
    #[arg(last = true, value_name = "TEST_COMMAND")]
    pub test_command: Vec<String>,
}

impl Args {
    /// Parses the process arguments, exiting with `InvalidArguments` on
    /// bad input and with `Success` after `--help` or `--version`.
    pub fn parse_args() -> Self {
        Self::try_parse().unwrap_or_else(|e| {
            let code = if e.use_stderr() {
                ExitCode::InvalidArguments
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            std::process::exit(code.as_i32())
        })
    }
}

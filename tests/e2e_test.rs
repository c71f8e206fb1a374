/// End-to-end tests for the CLI
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

/// A port nothing is listening on
fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// Exit code tests for CLI
mod exit_code_tests {
    use super::*;

    /// Exit code 0: --help should return success
    #[test]
    fn test_exit_code_help() {
        cargo_bin_cmd!("cdn-harness").arg("--help").assert().code(0);
    }

    /// Exit code 0: --version should return success
    #[test]
    fn test_exit_code_version() {
        cargo_bin_cmd!("cdn-harness").arg("--version").assert().code(0);
    }

    /// Exit code 2: Invalid arguments
    #[test]
    fn test_exit_code_invalid_argument() {
        cargo_bin_cmd!("cdn-harness")
            .arg("--invalid-option")
            .assert()
            .code(2);
    }

    /// Exit code 2: Port out of range
    #[test]
    fn test_exit_code_invalid_port() {
        cargo_bin_cmd!("cdn-harness")
            .args(["--port", "70000"])
            .assert()
            .code(2);
    }

    /// Exit code 2: Malformed readiness specifier
    #[test]
    fn test_exit_code_invalid_readiness_specifier() {
        cargo_bin_cmd!("cdn-harness")
            .args(["--probe-specifier", "@babel"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Invalid package specifier"));
    }

    /// Exit code 1: Server binary does not exist
    #[test]
    fn test_exit_code_missing_server_binary() {
        cargo_bin_cmd!("cdn-harness")
            .args([
                "--server-bin",
                "/nonexistent/sandpack-cdn",
                "--readiness-attempts",
                "1",
                "--",
                "true",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Failed to spawn server process"));
    }

    /// Exit code 1: Invalid environment
    #[test]
    fn test_exit_code_invalid_port_env() {
        cargo_bin_cmd!("cdn-harness")
            .env("PORT", "not-a-port")
            .args(["--", "true"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid PORT value"));
    }
}

mod decode_token_tests {
    use super::*;

    #[test]
    fn test_decode_versioned_token() {
        cargo_bin_cmd!("cdn-harness")
            .args(["--decode-token", "MyhyZWFjdC1kb21AMTguMS4wKQ=="])
            .assert()
            .code(0)
            .stdout("v3 react-dom@18.1.0\n");
    }

    #[test]
    fn test_decode_legacy_token() {
        // base64 of "react@18.1.0"
        cargo_bin_cmd!("cdn-harness")
            .args(["--decode-token", "cmVhY3RAMTguMS4w"])
            .assert()
            .code(0)
            .stdout("legacy react@18.1.0\n");
    }

    #[test]
    fn test_decode_token_with_version_zero_fails() {
        // base64 of "0(x)"
        cargo_bin_cmd!("cdn-harness")
            .args(["--decode-token", "MCh4KQ=="])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Unsupported protocol version: 0"));
    }
}

#[cfg(unix)]
mod run_tests {
    use super::*;
    use httpmock::prelude::*;

    fn mock_cdn() -> MockServer {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("/package/");
            then.status(200).body("{}");
        });
        server
    }

    fn harness_args(port: u16) -> Vec<String> {
        [
            "--server-bin",
            "sleep",
            "--server-arg",
            "30",
            "--host",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--readiness-attempts",
            "5",
            "--readiness-interval-ms",
            "10",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_e2e_passing_run() {
        let server = mock_cdn();

        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(server.port()))
            .args(["--", "true"])
            .assert()
            .code(0)
            .stderr(predicate::str::contains("Server has responded successfully"))
            .stderr(predicate::str::contains("Tests passed"));
    }

    #[test]
    fn test_e2e_server_error_status_still_counts_as_ready() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("/package/");
            then.status(500).body("Internal Server Error");
        });

        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(server.port()))
            .args(["--", "true"])
            .assert()
            .code(0)
            .stderr(predicate::str::contains("Tests passed"));
    }

    #[test]
    fn test_e2e_custom_readiness_specifier() {
        let server = MockServer::start();
        // base64 of "3(preact@10.11.0)"
        let mock = server.mock(|when, then| {
            when.method(GET).path("/package/MyhwcmVhY3RAMTAuMTEuMCk=");
            then.status(200).body("{}");
        });

        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(server.port()))
            .args(["--probe-specifier", "preact@10.11.0", "--", "true"])
            .assert()
            .code(0);
        assert!(mock.hits() >= 1);
    }

    #[test]
    fn test_e2e_failing_run() {
        let server = mock_cdn();

        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(server.port()))
            .args(["--", "false"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Tests failed (runner exit code: 1)"));
    }

    #[test]
    fn test_e2e_runner_receives_cdn_root() {
        let server = mock_cdn();
        let check = format!(
            "test \"$CDN_ROOT\" = \"http://127.0.0.1:{}\"",
            server.port()
        );

        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(server.port()))
            .args(["--", "sh", "-c", &check])
            .assert()
            .code(0);
    }

    #[test]
    fn test_e2e_readiness_timeout() {
        cargo_bin_cmd!("cdn-harness")
            .args(harness_args(unused_port()))
            .args(["--", "true"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("did not become ready after 5 attempt(s)"))
            .stderr(predicate::str::contains("Tests passed").not());
    }

    #[test]
    fn test_e2e_server_exits_early() {
        cargo_bin_cmd!("cdn-harness")
            .args([
                "--server-bin",
                "false",
                "--host",
                "127.0.0.1",
                "--port",
                &unused_port().to_string(),
                "--readiness-attempts",
                "50",
                "--readiness-interval-ms",
                "20",
                "--",
                "true",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("exited before becoming ready"));
    }
}

use std::fmt;
use thiserror::Error;

/// Exit codes for the harness binary.
///
/// CI only needs to distinguish a clean run from anything else, so every
/// fatal harness condition collapses into `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Server became ready and the test runner exited with status 0
    Success = 0,
    /// Readiness timeout, failed test run, spawn failure, etc.
    Failure = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::Failure => write!(f, "Failure (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
        }
    }
}

/// Errors raised while talking to the CDN.
///
/// Codec, fetch and client layers all return this type and never wrap it
/// further, so callers see exactly what the lowest layer produced.
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("Failed to build HTTP client\nDetails: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("CDN returned status {status} for {url}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status {
        url: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Request failed after {attempts} attempt(s)")]
    RequestExhausted {
        attempts: u32,
        #[source]
        source: Box<CdnError>,
    },

    #[error("Failed to decode {endpoint} response\nDetails: {details}")]
    Decode {
        endpoint: &'static str,
        details: String,
    },

    #[error("Invalid back-reference for '{path}': index {index} {reason}")]
    InvalidBackReference {
        path: String,
        index: u64,
        reason: String,
    },

    #[error("Failed to encode request payload\nDetails: {details}")]
    Encode { details: String },

    #[error("Invalid request token '{token}'\nDetails: {details}")]
    InvalidToken { token: String, details: String },

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid package specifier: '{0}'")]
    InvalidSpecifier(String),

    #[error("Invalid dependency key '{key}': {reason}")]
    InvalidDepsKey { key: String, reason: String },
}

impl CdnError {
    /// The error from the final attempt, looking through `RequestExhausted`.
    pub fn last_attempt_error(&self) -> &CdnError {
        match self {
            CdnError::RequestExhausted { source, .. } => source.last_attempt_error(),
            other => other,
        }
    }
}

/// Errors that abort a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to spawn {role} process '{program}'\nDetails: {source}\n\n💡 Hint: Check that the binary exists and is executable")]
    Spawn {
        role: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server at {address} did not become ready after {attempts} attempt(s)\n\n💡 Hint: Check the server output above for startup errors")]
    ReadinessTimeout { address: String, attempts: u32 },

    #[error("Server process exited before becoming ready (status: {status})")]
    ServerExited { status: String },

    #[error("Tests failed (runner exit code: {})", .code.map(|c| c.to_string()).unwrap_or_else(|| "terminated by signal".to_string()))]
    TestRunFailed { code: Option<i32> },

    #[error("Failed to wait for {role} process\nDetails: {source}")]
    Wait {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to terminate {role} process\nDetails: {source}")]
    Terminate {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Failure.as_i32(), 1);
        assert_eq!(ExitCode::InvalidArguments.as_i32(), 2);
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(format!("{}", ExitCode::Success), "Success (0)");
        assert_eq!(format!("{}", ExitCode::Failure), "Failure (1)");
        assert_eq!(
            format!("{}", ExitCode::InvalidArguments),
            "Invalid Arguments (2)"
        );
    }

    #[test]
    fn test_status_error_display_with_message() {
        let error = CdnError::Status {
            url: "http://localhost:8080/package/abc".to_string(),
            status: 500,
            message: Some("Package version not found".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("status 500"));
        assert!(display.contains("/package/abc"));
        assert!(display.contains(": Package version not found"));
    }

    #[test]
    fn test_status_error_display_without_message() {
        let error = CdnError::Status {
            url: "http://localhost/x".to_string(),
            status: 404,
            message: None,
        };
        assert_eq!(
            format!("{}", error),
            "CDN returned status 404 for http://localhost/x"
        );
    }

    #[test]
    fn test_last_attempt_error_unwraps_exhausted() {
        let error = CdnError::RequestExhausted {
            attempts: 5,
            source: Box::new(CdnError::InvalidSpecifier("attempt 5".to_string())),
        };
        match error.last_attempt_error() {
            CdnError::InvalidSpecifier(s) => assert_eq!(s, "attempt 5"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_readiness_timeout_display() {
        let error = HarnessError::ReadinessTimeout {
            address: "http://localhost:9000".to_string(),
            attempts: 25,
        };
        let display = format!("{}", error);
        assert!(display.contains("did not become ready after 25 attempt(s)"));
        assert!(display.contains("💡 Hint:"));
    }

    #[test]
    fn test_test_run_failed_display() {
        let error = HarnessError::TestRunFailed { code: Some(101) };
        assert!(format!("{}", error).contains("runner exit code: 101"));

        let error = HarnessError::TestRunFailed { code: None };
        assert!(format!("{}", error).contains("terminated by signal"));
    }
}

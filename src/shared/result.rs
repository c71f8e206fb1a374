use super::error::CdnError;

/// Type alias for Result with anyhow::Error as the error type.
/// Used at the application edge, where errors are only reported.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Result type for the protocol, fetch and client layers.
pub type CdnResult<T> = std::result::Result<T, CdnError>;

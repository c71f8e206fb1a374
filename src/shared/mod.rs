/// Shared error types and result aliases
pub mod error;
pub mod result;

pub use result::{CdnResult, Result};

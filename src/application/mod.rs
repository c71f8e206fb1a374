/// Application layer - Use cases and DTOs
///
/// This layer drives a harness run, coordinating child processes and the
/// CDN through ports.
pub mod dto;
pub mod use_cases;

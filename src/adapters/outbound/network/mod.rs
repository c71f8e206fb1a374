/// Network adapters for talking to the CDN
mod cdn_client;
mod readiness_probe;
mod retry_fetch;

pub use cdn_client::{CdnClient, Endpoint};
pub use readiness_probe::CdnReadinessProbe;
pub use retry_fetch::{retry_with, Exhausted, RetryFetch, RetryPolicy};

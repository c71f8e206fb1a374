use crate::shared::CdnResult;
use async_trait::async_trait;

/// ReadinessProbe port used while waiting for a spawned server
///
/// One call is one attempt; the caller owns pacing and the attempt bound.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Issues a single known-valid request and succeeds on a success status
    async fn probe(&self) -> CdnResult<()>;

    /// Address being probed, for messages
    fn address(&self) -> &str;
}

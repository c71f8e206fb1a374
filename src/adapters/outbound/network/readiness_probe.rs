use super::cdn_client::CdnClient;
use super::retry_fetch::RetryPolicy;
use crate::cdn_protocol::{ProtocolVersion, Specifier};
use crate::config::CdnConfig;
use crate::ports::outbound::ReadinessProbe;
use crate::shared::CdnResult;
use async_trait::async_trait;

/// Probes a freshly spawned CDN with a module request.
///
/// The server counts as up as soon as it answers with any HTTP status; only
/// transport errors fail a probe. Each probe is a single attempt bounded by
/// the client's request timeout; pacing and the attempt bound belong to the
/// caller.
pub struct CdnReadinessProbe {
    client: CdnClient,
    specifier: Specifier,
}

impl CdnReadinessProbe {
    /// Creates a probe for `react-dom@18.1.0` against `address`
    pub fn new(address: &str) -> CdnResult<Self> {
        Self::with_specifier(address, Self::default_specifier())
    }

    pub fn default_specifier() -> Specifier {
        Specifier::new("react-dom", "18.1.0")
    }

    pub fn with_specifier(address: &str, specifier: Specifier) -> CdnResult<Self> {
        let config = CdnConfig {
            root: address.to_string(),
            protocol_version: ProtocolVersion::V3,
            retry: RetryPolicy::single_attempt(),
            ..CdnConfig::default()
        };

        Ok(Self {
            client: CdnClient::new(config)?,
            specifier,
        })
    }

    pub fn specifier(&self) -> &Specifier {
        &self.specifier
    }
}

#[async_trait]
impl ReadinessProbe for CdnReadinessProbe {
    async fn probe(&self) -> CdnResult<()> {
        self.client.probe(&self.specifier).await.map(|_| ())
    }

    fn address(&self) -> &str {
        &self.client.config().root
    }
}

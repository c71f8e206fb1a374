use super::retry_fetch::RetryFetch;
use crate::cdn_protocol::{
    decode_manifest_response, decode_module_response_with, decode_v2_deps, decode_v2_module,
    encode_manifest, encode_request, encode_specifier_set, CdnModule, ManifestRequest,
    ProtocolVersion, ResolvedDependency, Specifier, V2Deps, V2Module,
};
use crate::config::CdnConfig;
use crate::shared::CdnResult;

/// CDN endpoints and their path templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Package,
    V2Module,
    V2Deps,
    DepTree,
}

impl Endpoint {
    pub fn path_prefix(self) -> &'static str {
        match self {
            Endpoint::Package => "/package/",
            Endpoint::V2Module => "/v2/mod/",
            Endpoint::V2Deps => "/v2/deps/",
            Endpoint::DepTree => "/dep_tree/",
        }
    }

    /// The server reads `/v2` tokens as plain base64, so those are always
    /// sent unversioned.
    pub fn protocol(self, configured: ProtocolVersion) -> ProtocolVersion {
        match self {
            Endpoint::Package | Endpoint::DepTree => configured,
            Endpoint::V2Module | Endpoint::V2Deps => ProtocolVersion::Legacy,
        }
    }
}

/// CdnClient composes request encoding, RetryFetch and response decoding
/// for each CDN endpoint.
///
/// Errors from either layer are returned as-is; the client adds no retries
/// of its own.
#[derive(Debug, Clone)]
pub struct CdnClient {
    config: CdnConfig,
    fetcher: RetryFetch,
}

impl CdnClient {
    /// Creates a client with a default-configured fetcher
    pub fn new(config: CdnConfig) -> CdnResult<Self> {
        Ok(Self::with_fetcher(config, RetryFetch::new()?))
    }

    pub fn with_fetcher(config: CdnConfig, fetcher: RetryFetch) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CdnConfig {
        &self.config
    }

    /// Builds the full URL for `payload` sent to `endpoint`
    pub fn endpoint_url(&self, endpoint: Endpoint, payload: &str) -> String {
        let token = encode_request(payload, endpoint.protocol(self.config.protocol_version));
        format!(
            "{}{}{}",
            self.config.root.trim_end_matches('/'),
            endpoint.path_prefix(),
            token
        )
    }

    async fn get(&self, endpoint: Endpoint, payload: &str) -> CdnResult<Vec<u8>> {
        let url = self.endpoint_url(endpoint, payload);
        self.fetcher.fetch(&url, &self.config.retry).await
    }

    /// Fetches a processed module (`/package/<token>`)
    pub async fn fetch_module(&self, name: &str, version: &str) -> CdnResult<CdnModule> {
        let specifier = Specifier::new(name, version);
        let body = self.get(Endpoint::Package, &specifier.to_string()).await?;
        decode_module_response_with(&body, self.config.integer_entries)
    }

    /// Fetches raw module files (`/v2/mod/<token>`)
    pub async fn fetch_v2_module(&self, name: &str, version: &str) -> CdnResult<V2Module> {
        let specifier = Specifier::new(name, version);
        let body = self.get(Endpoint::V2Module, &specifier.to_string()).await?;
        decode_v2_module(&body)
    }

    /// Resolves a specifier set to one version per major (`/v2/deps/<token>`).
    ///
    /// The returned mapping is not validated; call [`V2Deps::validate`].
    pub async fn fetch_v2_deps(&self, specifiers: &[Specifier]) -> CdnResult<V2Deps> {
        let body = self
            .get(Endpoint::V2Deps, &encode_specifier_set(specifiers))
            .await?;
        decode_v2_deps(&body)
    }

    /// Resolves a manifest into its dependency tree (`/dep_tree/<token>`)
    pub async fn fetch_manifest(
        &self,
        manifest: &ManifestRequest,
    ) -> CdnResult<Vec<ResolvedDependency>> {
        let payload = encode_manifest(manifest)?;
        let body = self.get(Endpoint::DepTree, &payload).await?;
        decode_manifest_response(&body)
    }

    /// Requests a module and returns whatever status the server answers
    /// with. Only a failure to reach the server is an error.
    pub async fn probe(&self, specifier: &Specifier) -> CdnResult<u16> {
        let url = self.endpoint_url(Endpoint::Package, &specifier.to_string());
        self.fetcher.fetch_status(&url, &self.config.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::network::RetryPolicy;

    fn client(root: &str, protocol_version: ProtocolVersion) -> CdnClient {
        CdnClient::new(CdnConfig {
            root: root.to_string(),
            protocol_version,
            retry: RetryPolicy::single_attempt(),
            ..CdnConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_package_url_uses_configured_protocol() {
        let client = client("http://localhost:9000", ProtocolVersion::V3);
        assert_eq!(
            client.endpoint_url(Endpoint::Package, "react-dom@18.1.0"),
            "http://localhost:9000/package/MyhyZWFjdC1kb21AMTguMS4wKQ=="
        );
    }

    #[test]
    fn test_v2_urls_are_unversioned() {
        let client = client("http://localhost:8080/", ProtocolVersion::V3);
        let url = client.endpoint_url(Endpoint::V2Module, "react@18.1.0");
        assert_eq!(
            url,
            format!(
                "http://localhost:8080/v2/mod/{}",
                encode_request("react@18.1.0", ProtocolVersion::Legacy)
            )
        );

        let url = client.endpoint_url(Endpoint::V2Deps, "react@^18.1.0;next@^12.3.1");
        assert!(url.starts_with("http://localhost:8080/v2/deps/"));
        assert!(!url.contains("//v2"));
    }

    #[test]
    fn test_dep_tree_url() {
        let client = client("http://cdn.test", ProtocolVersion::V2);
        let url = client.endpoint_url(Endpoint::DepTree, "{\"react\":\"^18\"}");
        assert_eq!(
            url,
            format!(
                "http://cdn.test/dep_tree/{}",
                encode_request("{\"react\":\"^18\"}", ProtocolVersion::V2)
            )
        );
    }

    #[test]
    fn test_endpoint_protocol_selection() {
        assert_eq!(
            Endpoint::Package.protocol(ProtocolVersion::V1),
            ProtocolVersion::V1
        );
        assert_eq!(
            Endpoint::DepTree.protocol(ProtocolVersion::Legacy),
            ProtocolVersion::Legacy
        );
        assert_eq!(
            Endpoint::V2Deps.protocol(ProtocolVersion::V3),
            ProtocolVersion::Legacy
        );
    }
}

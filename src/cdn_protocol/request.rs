use crate::shared::error::CdnError;
use crate::shared::CdnResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator between specifiers in a specifier-set payload
pub const SPECIFIER_DELIMITER: char = ';';

/// Request protocol versions understood by the CDN.
///
/// `Legacy` requests carry no version marker at all; every other variant
/// wraps the payload as `<n>(<payload>)` before transport encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    Legacy,
    V1,
    V2,
    V3,
}

impl ProtocolVersion {
    /// Newest version the server accepts.
    pub const LATEST: ProtocolVersion = ProtocolVersion::V3;

    /// The number written into the version wrapper, `None` for `Legacy`.
    pub fn number(self) -> Option<u64> {
        match self {
            ProtocolVersion::Legacy => None,
            ProtocolVersion::V1 => Some(1),
            ProtocolVersion::V2 => Some(2),
            ProtocolVersion::V3 => Some(3),
        }
    }

    pub fn from_number(number: u64) -> CdnResult<Self> {
        match number {
            1 => Ok(ProtocolVersion::V1),
            2 => Ok(ProtocolVersion::V2),
            3 => Ok(ProtocolVersion::V3),
            other => Err(CdnError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "0" => Ok(ProtocolVersion::Legacy),
            other => other
                .parse::<u64>()
                .ok()
                .and_then(|n| ProtocolVersion::from_number(n).ok())
                .ok_or_else(|| {
                    format!(
                        "Invalid protocol version: {}. Please specify 'legacy', 1, 2 or 3",
                        s
                    )
                }),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(n) => write!(f, "v{}", n),
            None => write!(f, "legacy"),
        }
    }
}

/// A request payload tagged with the protocol version it is sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRequest {
    pub version: ProtocolVersion,
    pub payload: String,
}

impl VersionedRequest {
    pub fn new(version: ProtocolVersion, payload: impl Into<String>) -> Self {
        Self {
            version,
            payload: payload.into(),
        }
    }

    /// The text that gets transport-encoded: the bare payload for legacy
    /// requests, `<n>(<payload>)` otherwise.
    pub fn wire_payload(&self) -> String {
        match self.version.number() {
            Some(n) => format!("{}({})", n, self.payload),
            None => self.payload.clone(),
        }
    }

    /// Encodes the request into a token usable as a URL path segment.
    pub fn to_token(&self) -> String {
        STANDARD.encode(self.wire_payload())
    }

    /// Decodes a token the way the server does.
    ///
    /// A payload of the form `<digits>(...)` is versioned and its digits must
    /// name a version between 1 and [`ProtocolVersion::LATEST`]; anything
    /// else, `0` and numbers too large to parse included, is rejected with
    /// `UnsupportedVersion`. Legacy requests carry no wrapper, so any other
    /// payload is returned as a legacy request.
    pub fn from_token(token: &str) -> CdnResult<Self> {
        let invalid = |details: String| CdnError::InvalidToken {
            token: token.to_string(),
            details,
        };
        let bytes = STANDARD.decode(token).map_err(|e| invalid(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;

        if let Some((version, payload)) = split_version_wrapper(&text) {
            let protocol = version
                .parse::<u64>()
                .ok()
                .and_then(|number| ProtocolVersion::from_number(number).ok())
                .ok_or_else(|| CdnError::UnsupportedVersion(version.to_string()))?;
            return Ok(Self::new(protocol, payload));
        }

        Ok(Self::new(ProtocolVersion::Legacy, text))
    }
}

/// Splits `<digits>(<payload>)` into its parts.
fn split_version_wrapper(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let (version, rest) = text.split_at(open);
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let payload = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some((version, payload))
}

/// Encodes `payload` into a URL-safe token under `version`.
pub fn encode_request(payload: &str, version: ProtocolVersion) -> String {
    VersionedRequest::new(version, payload).to_token()
}

/// A package identity: name plus semver range or exact version.
///
/// An empty range (as well as `*` or `latest`) means "any"/"newest".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specifier {
    pub name: String,
    #[serde(default)]
    pub range: String,
}

impl Specifier {
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@')
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.range)
        }
    }
}

impl FromStr for Specifier {
    type Err = CdnError;

    /// Parses `name@range`, keeping the leading `@` of scoped names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let search_from = usize::from(trimmed.starts_with('@'));
        let (name, range) = match trimmed[search_from..].find('@') {
            Some(pos) => {
                let at = search_from + pos;
                (&trimmed[..at], &trimmed[at + 1..])
            }
            None => (trimmed, ""),
        };

        if name.is_empty() || name == "@" {
            return Err(CdnError::InvalidSpecifier(s.to_string()));
        }
        if name.starts_with('@') && !name.contains('/') {
            return Err(CdnError::InvalidSpecifier(s.to_string()));
        }

        Ok(Specifier::new(name, range))
    }
}

/// Joins specifiers with `;`.
///
/// Order is preserved: the server uses the joined text as part of its cache
/// key, so callers must not reorder.
pub fn encode_specifier_set(specifiers: &[Specifier]) -> String {
    specifiers
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(&SPECIFIER_DELIMITER.to_string())
}

/// Root dependencies of a manifest: package name to requested range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestRequest {
    dependencies: BTreeMap<String, String>,
}

impl ManifestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the range for `name`.
    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.insert(name, range);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, range: impl Into<String>) {
        self.dependencies.insert(name.into(), range.into());
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.dependencies.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ManifestRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut manifest = ManifestRequest::new();
        for (name, range) in iter {
            manifest.insert(name, range);
        }
        manifest
    }
}

/// Serializes the manifest as a JSON object.
pub fn encode_manifest(manifest: &ManifestRequest) -> CdnResult<String> {
    serde_json::to_string(manifest).map_err(|e| CdnError::Encode {
        details: e.to_string(),
    })
}

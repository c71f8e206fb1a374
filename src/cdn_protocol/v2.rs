//! MessagePack-encoded responses of the `/v2` endpoints.

use crate::shared::error::CdnError;
use crate::shared::CdnResult;
use serde_bytes::ByteBuf;
use std::collections::BTreeMap;

/// File path to raw file content.
pub type V2Module = BTreeMap<String, Vec<u8>>;

/// Resolved versions keyed by `<name>@<major>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct V2Deps {
    entries: BTreeMap<String, String>,
}

impl V2Deps {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// Checks that every key ends in `@<major>` and that the resolved
    /// version has exactly that major component.
    pub fn validate(&self) -> CdnResult<()> {
        for (key, version) in &self.entries {
            let (_, major) = split_deps_key(key)?;
            let parsed = semver::Version::parse(version).map_err(|e| CdnError::InvalidDepsKey {
                key: key.clone(),
                reason: format!("value '{}' is not a valid semver version: {}", version, e),
            })?;
            if parsed.major != major {
                return Err(CdnError::InvalidDepsKey {
                    key: key.clone(),
                    reason: format!(
                        "resolved version {} has major {}, expected {}",
                        version, parsed.major, major
                    ),
                });
            }
        }
        Ok(())
    }
}

impl From<BTreeMap<String, String>> for V2Deps {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

/// Splits `name@major` on the last `@`.
///
/// The suffix must be a non-negative integer; anything else is rejected
/// rather than passed through.
pub fn split_deps_key(key: &str) -> CdnResult<(&str, u64)> {
    let invalid = |reason: String| CdnError::InvalidDepsKey {
        key: key.to_string(),
        reason,
    };
    let (name, major) = key
        .rsplit_once('@')
        .ok_or_else(|| invalid("missing '@<major>' suffix".to_string()))?;
    if name.is_empty() {
        return Err(invalid("missing package name".to_string()));
    }
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!(
            "major version '{}' is not a non-negative integer",
            major
        )));
    }
    let major = major
        .parse::<u64>()
        .map_err(|e| invalid(format!("major version '{}': {}", major, e)))?;
    Ok((name, major))
}

/// Decodes a `/v2/mod/<token>` response.
pub fn decode_v2_module(bytes: &[u8]) -> CdnResult<V2Module> {
    let files: BTreeMap<String, ByteBuf> =
        rmp_serde::from_slice(bytes).map_err(|e| CdnError::Decode {
            endpoint: "v2/mod",
            details: e.to_string(),
        })?;
    Ok(files
        .into_iter()
        .map(|(path, content)| (path, content.into_vec()))
        .collect())
}

/// Decodes a `/v2/deps/<token>` response. Key format is not checked here;
/// see [`V2Deps::validate`].
pub fn decode_v2_deps(bytes: &[u8]) -> CdnResult<V2Deps> {
    let entries: BTreeMap<String, String> =
        rmp_serde::from_slice(bytes).map_err(|e| CdnError::Decode {
            endpoint: "v2/deps",
            details: e.to_string(),
        })?;
    Ok(V2Deps::from(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn msgpack<T: Serialize>(value: &T) -> Vec<u8> {
        rmp_serde::to_vec(value).unwrap()
    }

    #[test]
    fn test_decode_v2_module_binary_content() {
        let mut files: BTreeMap<String, ByteBuf> = BTreeMap::new();
        files.insert("package.json".to_string(), ByteBuf::from(b"{}".to_vec()));
        files.insert("index.js".to_string(), ByteBuf::from(vec![0u8, 159, 146, 150]));

        let module = decode_v2_module(&msgpack(&files)).unwrap();
        assert_eq!(module.len(), 2);
        assert_eq!(module["package.json"], b"{}".to_vec());
        assert_eq!(module["index.js"], vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn test_decode_v2_module_rejects_garbage() {
        let result = decode_v2_module(&[0xc1, 0x00]);
        assert!(matches!(
            result,
            Err(CdnError::Decode {
                endpoint: "v2/mod",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_v2_deps() {
        let mut entries = BTreeMap::new();
        entries.insert("react@18".to_string(), "18.2.0".to_string());
        entries.insert("next@12".to_string(), "12.3.4".to_string());

        let deps = decode_v2_deps(&msgpack(&entries)).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps.get("react@18"), Some("18.2.0"));
        assert!(deps.validate().is_ok());
    }

    #[test]
    fn test_split_deps_key_scoped_name() {
        let (name, major) = split_deps_key("@babel/runtime@7").unwrap();
        assert_eq!(name, "@babel/runtime");
        assert_eq!(major, 7);
    }

    #[test]
    fn test_split_deps_key_zero_major() {
        assert_eq!(split_deps_key("js-tokens@0").unwrap(), ("js-tokens", 0));
    }

    #[test]
    fn test_split_deps_key_rejects_non_numeric_suffix() {
        for key in ["react@latest", "react@", "react", "react@-1", "react@1.2", "@18"] {
            assert!(
                matches!(split_deps_key(key), Err(CdnError::InvalidDepsKey { .. })),
                "key {key} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_major_mismatch() {
        let mut entries = BTreeMap::new();
        entries.insert("react@17".to_string(), "18.2.0".to_string());
        let deps = V2Deps::from(entries);
        let error = deps.validate().unwrap_err();
        assert!(format!("{}", error).contains("has major 18, expected 17"));
    }

    #[test]
    fn test_validate_rejects_invalid_semver_value() {
        let mut entries = BTreeMap::new();
        entries.insert("react@18".to_string(), "not-a-version".to_string());
        let deps = V2Deps::from(entries);
        assert!(matches!(
            deps.validate(),
            Err(CdnError::InvalidDepsKey { .. })
        ));
    }

    #[test]
    fn test_validate_prerelease_version() {
        let mut entries = BTreeMap::new();
        entries.insert("framer@2".to_string(), "2.0.0-beta.13".to_string());
        assert!(V2Deps::from(entries).validate().is_ok());
    }
}

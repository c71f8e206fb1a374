use crate::shared::error::CdnError;
use crate::shared::CdnResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One entry of a resolved dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "v")]
    pub version: String,
    /// Distance from the manifest roots; 0 means directly requested
    #[serde(rename = "d")]
    pub depth: u32,
}

/// A file the CDN processed, with its content and import specifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "c", alias = "content")]
    pub content: String,
    #[serde(rename = "d", alias = "dependencies", default)]
    pub dependencies: Vec<String>,
    #[serde(rename = "t", alias = "isTranspiled", default)]
    pub is_transpiled: bool,
}

/// A decoded file entry.
///
/// Back-references share the descriptor allocation of the entry they point
/// at, so `Arc::ptr_eq` holds between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    Descriptor(Arc<FileDescriptor>),
    BackReference {
        index: usize,
        descriptor: Arc<FileDescriptor>,
    },
    /// A file the server skipped; only its byte size is sent
    Ignored { size: u64 },
    /// A file the server could not process (`false` on the wire)
    Failed,
}

impl FileEntry {
    /// The file's descriptor, `None` for ignored and failed files.
    pub fn descriptor(&self) -> Option<&Arc<FileDescriptor>> {
        match self {
            FileEntry::Descriptor(descriptor) => Some(descriptor),
            FileEntry::BackReference { descriptor, .. } => Some(descriptor),
            FileEntry::Ignored { .. } | FileEntry::Failed => None,
        }
    }

    pub fn is_back_reference(&self) -> bool {
        matches!(self, FileEntry::BackReference { .. })
    }
}

/// How integer file entries are read.
///
/// The protocol documents them as back-references to an earlier entry,
/// while deployed servers send the byte size of a file they skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegerEntries {
    #[default]
    BackReference,
    IgnoredSize,
}

impl IntegerEntries {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegerEntries::BackReference => "back-reference",
            IntegerEntries::IgnoredSize => "size",
        }
    }
}

impl std::str::FromStr for IntegerEntries {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back-reference" | "backreference" | "reference" => Ok(IntegerEntries::BackReference),
            "size" | "ignored" => Ok(IntegerEntries::IgnoredSize),
            other => Err(format!(
                "Unknown integer entry mode '{}' (expected 'back-reference' or 'size')",
                other
            )),
        }
    }
}

impl std::fmt::Display for IntegerEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of a file entry: an object, an integer or a boolean.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFileEntry {
    Descriptor(FileDescriptor),
    Integer(u64),
    Flag(bool),
}

#[derive(Debug, Deserialize)]
struct RawModule {
    #[serde(rename = "f")]
    files: IndexMap<String, RawFileEntry>,
    #[serde(rename = "m", default)]
    modules: Vec<String>,
}

/// A module as served by `/package/<token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnModule {
    /// Files in the order the server sent them
    pub files: IndexMap<String, FileEntry>,
    /// Modules this package needs at runtime, to be fetched eagerly
    pub transient_deps: Vec<String>,
}

impl CdnModule {
    pub fn file(&self, path: &str) -> Option<&FileDescriptor> {
        self.files
            .get(path)
            .and_then(|entry| entry.descriptor())
            .map(Arc::as_ref)
    }
}

fn decode_error(endpoint: &'static str, error: impl ToString) -> CdnError {
    CdnError::Decode {
        endpoint,
        details: error.to_string(),
    }
}

/// Decodes a `/dep_tree/<token>` response.
pub fn decode_manifest_response(bytes: &[u8]) -> CdnResult<Vec<ResolvedDependency>> {
    serde_json::from_slice(bytes).map_err(|e| decode_error("dep_tree", e))
}

/// Decodes a `/package/<token>` response, resolving back-references.
pub fn decode_module_response(bytes: &[u8]) -> CdnResult<CdnModule> {
    decode_module_response_with(bytes, IntegerEntries::BackReference)
}

/// Decodes a `/package/<token>` response, reading integer entries as `mode`
/// says.
pub fn decode_module_response_with(bytes: &[u8], mode: IntegerEntries) -> CdnResult<CdnModule> {
    let raw: RawModule = serde_json::from_slice(bytes).map_err(|e| decode_error("package", e))?;
    let files = resolve_file_entries(raw.files, mode)?;
    Ok(CdnModule {
        files,
        transient_deps: raw.modules,
    })
}

/// Materializes raw entries in order; a back-reference may only point at an
/// earlier descriptor entry.
fn resolve_file_entries(
    raw: IndexMap<String, RawFileEntry>,
    mode: IntegerEntries,
) -> CdnResult<IndexMap<String, FileEntry>> {
    let mut files: IndexMap<String, FileEntry> = IndexMap::with_capacity(raw.len());

    for (position, (path, entry)) in raw.into_iter().enumerate() {
        let resolved = match (entry, mode) {
            (RawFileEntry::Descriptor(descriptor), _) => {
                FileEntry::Descriptor(Arc::new(descriptor))
            }
            (RawFileEntry::Flag(false), _) => FileEntry::Failed,
            (RawFileEntry::Flag(true), _) => {
                return Err(decode_error(
                    "package",
                    format!("file '{}' is marked `true`, only `false` is meaningful", path),
                ))
            }
            (RawFileEntry::Integer(size), IntegerEntries::IgnoredSize) => {
                FileEntry::Ignored { size }
            }
            (RawFileEntry::Integer(index), IntegerEntries::BackReference) => {
                let invalid = |reason: &str| CdnError::InvalidBackReference {
                    path: path.clone(),
                    index,
                    reason: reason.to_string(),
                };
                let target = usize::try_from(index)
                    .ok()
                    .filter(|i| *i < position)
                    .ok_or_else(|| invalid("does not point at an earlier entry"))?;
                match files.get_index(target) {
                    Some((_, FileEntry::Descriptor(descriptor))) => FileEntry::BackReference {
                        index: target,
                        descriptor: Arc::clone(descriptor),
                    },
                    Some((_, FileEntry::BackReference { .. })) => {
                        return Err(invalid("points at another back-reference"))
                    }
                    _ => return Err(invalid("points at an entry without content")),
                }
            }
        };
        files.insert(path, resolved);
    }

    Ok(files)
}

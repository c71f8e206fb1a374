/// Request encoding and response decoding for the package CDN
///
/// Pure functions over strings and bytes; nothing here performs I/O.
pub mod request;
pub mod response;
pub mod v2;

pub use request::{
    encode_manifest, encode_request, encode_specifier_set, ManifestRequest, ProtocolVersion,
    Specifier, VersionedRequest,
};
pub use response::{
    decode_manifest_response, decode_module_response, decode_module_response_with, CdnModule,
    FileDescriptor, FileEntry, IntegerEntries, ResolvedDependency,
};
pub use v2::{decode_v2_deps, decode_v2_module, split_deps_key, V2Deps, V2Module};

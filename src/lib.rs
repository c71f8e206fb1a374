//! cdn-harness - client and end-to-end test harness for the Sandpack package CDN
//!
//! This library encodes requests for the CDN's versioned protocol, decodes its
//! responses, and drives a live server instance through a test run.
//!
//! # Architecture
//!
//! - **Protocol** (`cdn_protocol`): request tokens, specifiers, response decoders
//! - **Application Layer** (`application`): the harness use case and its settings
//! - **Ports** (`ports`): interfaces the application core depends on
//! - **Adapters** (`adapters`): HTTP client with retries, child processes, console
//! - **Shared** (`shared`): error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use cdn_harness::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), CdnError> {
//! let env = EnvConfig::from_env().expect("valid environment");
//! let client = CdnClient::new(CdnConfig::from_env_config(&env))?;
//!
//! let module = client.fetch_module("react", "18.1.0").await?;
//! println!("{} files, {} transient deps", module.files.len(), module.transient_deps.len());
//!
//! let deps = client
//!     .fetch_v2_deps(&[Specifier::new("react", "^18.1.0")])
//!     .await?;
//! deps.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod cdn_protocol;
pub mod config;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::network::{
        CdnClient, CdnReadinessProbe, Endpoint, RetryFetch, RetryPolicy,
    };
    pub use crate::adapters::outbound::process::{ManagedProcess, ProcessSpec};
    pub use crate::application::dto::HarnessSettings;
    pub use crate::application::use_cases::{HarnessState, RunHarnessUseCase};
    pub use crate::cdn_protocol::{
        encode_manifest, encode_request, encode_specifier_set, CdnModule, FileDescriptor,
        FileEntry, IntegerEntries, ManifestRequest, ProtocolVersion, ResolvedDependency, Specifier, V2Deps,
        V2Module, VersionedRequest,
    };
    pub use crate::config::{CdnConfig, EnvConfig};
    pub use crate::ports::outbound::{ProgressReporter, ReadinessProbe};
    pub use crate::shared::error::{CdnError, ExitCode, HarnessError};
    pub use crate::shared::{CdnResult, Result};
}

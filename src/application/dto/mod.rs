/// Data Transfer Objects for application layer
///
/// DTOs carry resolved configuration from the CLI edge into use cases.
mod harness_settings;

pub use harness_settings::{HarnessSettings, HarnessSettingsBuilder};

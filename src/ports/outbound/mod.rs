/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the harness core uses
/// to interact with the console and the server under test.
pub mod progress_reporter;
pub mod readiness_probe;

pub use progress_reporter::ProgressReporter;
pub use readiness_probe::ReadinessProbe;

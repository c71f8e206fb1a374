/// Mock implementations for testing
mod mock_progress_reporter;
mod mock_readiness_probe;

pub use mock_progress_reporter::MockProgressReporter;
pub use mock_readiness_probe::MockReadinessProbe;

/// ProgressReporter port for reporting harness progress
///
/// The harness shares the terminal with the server and the test runner,
/// so implementations should write to stderr and never to stdout.
pub trait ProgressReporter: Send + Sync {
    /// Reports a progress message
    ///
    /// # Arguments
    /// * `message` - The progress message to report
    fn report(&self, message: &str);

    /// Reports a step of a bounded sequence (e.g. readiness attempts)
    ///
    /// # Arguments
    /// * `current` - Current step, starting at 1
    /// * `total` - Upper bound of steps
    /// * `message` - Optional message to include
    fn report_progress(&self, current: usize, total: usize, message: Option<&str>);

    /// Reports an error or warning message
    fn report_error(&self, message: &str);

    /// Reports completion of an operation
    fn report_completion(&self, message: &str);
}

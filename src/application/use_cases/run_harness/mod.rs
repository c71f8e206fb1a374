use crate::adapters::outbound::process::ManagedProcess;
use crate::application::dto::HarnessSettings;
use crate::config::PORT_ENV;
use crate::ports::outbound::{ProgressReporter, ReadinessProbe};
use crate::shared::error::HarnessError;

/// Lifecycle of one harness run.
///
/// `NotStarted → ServerStarting → ServerReady → TestsRunning → Passed|Failed → Cleaned`.
/// A fatal error at any earlier step goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    NotStarted,
    ServerStarting,
    ServerReady,
    TestsRunning,
    Passed,
    Failed,
    Cleaned,
}

/// RunHarnessUseCase - boots the CDN server, waits for it, runs the test
/// suite against it and always tears the server down.
///
/// # Type Parameters
/// * `P` - ReadinessProbe implementation
/// * `R` - ProgressReporter implementation
pub struct RunHarnessUseCase<P, R> {
    settings: HarnessSettings,
    probe: P,
    reporter: R,
    transitions: Vec<HarnessState>,
    server_signals: u32,
}

impl<P, R> RunHarnessUseCase<P, R>
where
    P: ReadinessProbe,
    R: ProgressReporter,
{
    pub fn new(settings: HarnessSettings, probe: P, reporter: R) -> Self {
        Self {
            settings,
            probe,
            reporter,
            transitions: vec![HarnessState::NotStarted],
            server_signals: 0,
        }
    }

    pub fn state(&self) -> HarnessState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(HarnessState::NotStarted)
    }

    /// Every state visited so far, in order
    pub fn transitions(&self) -> &[HarnessState] {
        &self.transitions
    }

    /// Kill signals sent to the server during cleanup
    pub fn server_signals(&self) -> u32 {
        self.server_signals
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn transition(&mut self, next: HarnessState) {
        self.transitions.push(next);
    }

    /// Executes one run.
    ///
    /// The server is terminated before this returns, whatever the outcome.
    /// When both the run and the cleanup fail, the run's error wins and the
    /// cleanup error is reported.
    ///
    /// # Errors
    /// `Spawn`, `ReadinessTimeout`, `ServerExited`, `TestRunFailed`, `Wait`
    /// or `Terminate`.
    pub async fn execute(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::ServerStarting);
        let server_spec = self.settings.server_spec();
        self.reporter.report(&format!(
            "🚀 Starting server: {} ({}={})",
            server_spec.command_line(),
            PORT_ENV,
            self.settings.port
        ));

        let mut server = match ManagedProcess::spawn(&server_spec) {
            Ok(server) => server,
            Err(e) => {
                self.transition(HarnessState::Failed);
                self.transition(HarnessState::Cleaned);
                return Err(e);
            }
        };

        let outcome = self.supervise(&mut server).await;
        if outcome.is_err() && self.state() != HarnessState::Failed {
            self.transition(HarnessState::Failed);
        }

        let cleanup = server.terminate().await;
        self.server_signals = server.signals_sent();
        self.transition(HarnessState::Cleaned);
        self.reporter.report("🧹 Server stopped");

        match (outcome, cleanup) {
            (Err(e), Err(cleanup_error)) => {
                self.reporter
                    .report_error(&format!("⚠️  Cleanup also failed: {}", cleanup_error));
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(cleanup_error)) => Err(cleanup_error),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    async fn supervise(&mut self, server: &mut ManagedProcess) -> Result<(), HarnessError> {
        server
            .wait_until_ready(
                &self.probe,
                self.settings.readiness_attempts,
                self.settings.readiness_interval,
                &self.reporter,
            )
            .await?;
        self.transition(HarnessState::ServerReady);
        self.reporter.report("✅ Server has responded successfully");

        let runner_spec = self.settings.runner_spec();
        self.reporter.report(&format!(
            "🧪 Running tests: {}",
            runner_spec.command_line()
        ));
        let mut runner = ManagedProcess::spawn(&runner_spec)?;
        self.transition(HarnessState::TestsRunning);

        let code = runner.wait_for_exit().await?;
        if code == Some(0) {
            self.transition(HarnessState::Passed);
            self.reporter.report_completion("✅ Tests passed");
            Ok(())
        } else {
            self.transition(HarnessState::Failed);
            Err(HarnessError::TestRunFailed { code })
        }
    }
}

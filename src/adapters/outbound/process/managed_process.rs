use crate::ports::outbound::{ProgressReporter, ReadinessProbe};
use crate::shared::error::HarnessError;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// How long `terminate` waits after SIGTERM before sending SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// What to launch and which variables to add to the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Short name used in messages, e.g. "server"
    pub role: &'static str,
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    /// Connect stdin to the null device instead of the parent's terminal
    pub null_stdin: bool,
}

impl ProcessSpec {
    pub fn new(role: &'static str, program: impl Into<String>) -> Self {
        Self {
            role,
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            null_stdin: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdin_null(mut self) -> Self {
        self.null_stdin = true;
        self
    }

    /// Human-readable command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Handle to a spawned child process.
///
/// Exposes the two waits the harness needs (`wait_until_ready` and
/// `wait_for_exit`) plus an idempotent `terminate`. Output streams are
/// inherited so child output shows up live; stdin is inherited unless the
/// spec asks for the null device. The child is killed if the handle is
/// dropped without being terminated.
#[derive(Debug)]
pub struct ManagedProcess {
    role: &'static str,
    child: Child,
    exit_status: Option<ExitStatus>,
    signals_sent: u32,
}

impl ManagedProcess {
    /// Spawns `spec` with the parent's environment plus `spec.envs`.
    pub fn spawn(spec: &ProcessSpec) -> Result<Self, HarnessError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.null_stdin {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| HarnessError::Spawn {
            role: spec.role,
            program: spec.program.clone(),
            source,
        })?;

        Ok(Self {
            role: spec.role,
            child,
            exit_status: None,
            signals_sent: 0,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Number of signals actually delivered to the child
    pub fn signals_sent(&self) -> u32 {
        self.signals_sent
    }

    /// Exit status if the child is known to have exited
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Non-blocking check whether the child has exited.
    pub fn has_exited(&mut self) -> Result<bool, HarnessError> {
        if self.exit_status.is_some() {
            return Ok(true);
        }
        let status = self.child.try_wait().map_err(|source| HarnessError::Wait {
            role: self.role,
            source,
        })?;
        self.exit_status = status;
        Ok(status.is_some())
    }

    /// Probes until the first success, at most `attempts` times with
    /// `interval` between attempts.
    ///
    /// # Errors
    /// - `ReadinessTimeout` when every attempt failed
    /// - `ServerExited` when the child exits while being probed
    pub async fn wait_until_ready<P, R>(
        &mut self,
        probe: &P,
        attempts: u32,
        interval: Duration,
        reporter: &R,
    ) -> Result<(), HarnessError>
    where
        P: ReadinessProbe + ?Sized,
        R: ProgressReporter + ?Sized,
    {
        for attempt in 1..=attempts {
            if self.has_exited()? {
                return Err(HarnessError::ServerExited {
                    status: describe_status(self.exit_status),
                });
            }

            reporter.report_progress(
                attempt as usize,
                attempts as usize,
                Some(format!("Trying to connect to {}...", probe.address()).as_str()),
            );
            match probe.probe().await {
                Ok(()) => return Ok(()),
                Err(e) => reporter.report_error(&format!(
                    "   Probe failed: {}",
                    e.last_attempt_error()
                )),
            }

            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(HarnessError::ReadinessTimeout {
            address: probe.address().to_string(),
            attempts,
        })
    }

    /// Waits for the child to exit and returns its exit code, `None` when
    /// it was terminated by a signal.
    pub async fn wait_for_exit(&mut self) -> Result<Option<i32>, HarnessError> {
        if let Some(status) = self.exit_status {
            return Ok(status.code());
        }
        let status = self.child.wait().await.map_err(|source| HarnessError::Wait {
            role: self.role,
            source,
        })?;
        self.exit_status = Some(status);
        Ok(status.code())
    }

    /// Asks the child to stop, force-kills it after `DEFAULT_GRACE_PERIOD`
    /// and reaps it.
    ///
    /// Safe to call any number of times: a child that already exited is
    /// only reaped, never signalled.
    pub async fn terminate(&mut self) -> Result<(), HarnessError> {
        self.terminate_with_grace(DEFAULT_GRACE_PERIOD).await
    }

    /// Sends SIGTERM, waits up to `grace` for the child to exit, then
    /// sends SIGKILL. Where SIGTERM is unavailable the child is killed
    /// straight away.
    pub async fn terminate_with_grace(&mut self, grace: Duration) -> Result<(), HarnessError> {
        if self.has_exited()? {
            return Ok(());
        }

        if self.request_stop()? {
            self.signals_sent += 1;
            if let Ok(result) = tokio::time::timeout(grace, self.wait_for_exit()).await {
                return result.map(|_| ());
            }
        }

        match self.child.start_kill() {
            Ok(()) => self.signals_sent += 1,
            // Raced with a natural exit
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(source) => {
                return Err(HarnessError::Terminate {
                    role: self.role,
                    source,
                })
            }
        }

        self.wait_for_exit().await.map(|_| ())
    }

    /// Sends SIGTERM. Returns `false` when there was nothing to signal.
    #[cfg(unix)]
    fn request_stop(&self) -> Result<bool, HarnessError> {
        let Some(pid) = self.child.id() else {
            return Ok(false);
        };
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return Ok(false);
        };

        // SAFETY: `pid` belongs to a child this handle has not reaped yet.
        if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
            return Ok(true);
        }
        let source = std::io::Error::last_os_error();
        if source.raw_os_error() == Some(libc::ESRCH) {
            return Ok(false);
        }
        Err(HarnessError::Terminate {
            role: self.role,
            source,
        })
    }

    #[cfg(not(unix))]
    fn request_stop(&self) -> Result<bool, HarnessError> {
        Ok(false)
    }
}

fn describe_status(status: Option<ExitStatus>) -> String {
    match status.and_then(|s| s.code()) {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

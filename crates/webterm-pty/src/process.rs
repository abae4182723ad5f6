//! Child process lifecycle.

use std::time::Duration;

use portable_pty::Child;
use tokio_util::sync::CancellationToken;

use crate::output::OutputReader;

/// How long output still in flight is collected after the child exits.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// How long a cancelled child gets to exit after SIGHUP before SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// `try_wait` polls (10 ms apart) after killing a child that was never run.
const DROP_REAP_ATTEMPTS: u32 = 10;

/// How the lifecycle task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// The child exited on its own.
    Exited { code: u32 },
    /// Cancellation was requested; the child was killed and reaped.
    Cancelled,
    /// Waiting on the child failed.
    Unknown(String),
}

/// Owns the spawned child until [`ProcessHandle::run`] reaps it.
pub struct ProcessHandle {
    child: Option<Box<dyn Child + Send + Sync>>,
    pid: Option<u32>,
}

impl ProcessHandle {
    pub(crate) fn new(child: Box<dyn Child + Send + Sync>) -> Self {
        let pid = child.process_id();
        Self {
            child: Some(child),
            pid,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Drive the process until it exits or `cancel` fires.
    ///
    /// `on_output` is invoked with `output` every time PTY output becomes
    /// available, and once more after the child exits so output already
    /// buffered is not lost. Once the output reaches EOF only the exit (or
    /// cancellation) is awaited. On cancellation the child is killed and
    /// reaped before this returns.
    pub async fn run<F>(
        mut self,
        mut output: OutputReader,
        cancel: CancellationToken,
        mut on_output: F,
    ) -> ProcessExit
    where
        F: FnMut(&mut OutputReader) + Send,
    {
        let Some(mut child) = self.child.take() else {
            return ProcessExit::Unknown("process already reaped".into());
        };
        let mut killer = child.clone_killer();
        let mut wait = tokio::task::spawn_blocking(move || child.wait());
        let mut output_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if let Err(e) = killer.kill() {
                        tracing::debug!(pid = ?self.pid, "PTY kill error (may already be dead): {e}");
                    }
                    if tokio::time::timeout(KILL_GRACE, &mut wait).await.is_err() {
                        tracing::warn!(pid = ?self.pid, "Child ignored SIGHUP, sending SIGKILL");
                        force_kill(self.pid);
                        if let Err(e) = wait.await {
                            tracing::debug!(pid = ?self.pid, "PTY wait task failed: {e}");
                        }
                    }
                    tracing::debug!(pid = ?self.pid, "Terminal process cancelled");
                    return ProcessExit::Cancelled;
                }

                status = &mut wait => {
                    if output_open {
                        drain_until_eof(&mut output, &mut on_output).await;
                    }
                    return match status {
                        Ok(Ok(status)) => {
                            tracing::debug!(pid = ?self.pid, code = status.exit_code(), "Terminal process exited");
                            ProcessExit::Exited { code: status.exit_code() }
                        }
                        Ok(Err(e)) => ProcessExit::Unknown(e.to_string()),
                        Err(e) => ProcessExit::Unknown(e.to_string()),
                    };
                }

                ready = output.ready(), if output_open => {
                    if ready {
                        on_output(&mut output);
                    }
                    if output.is_closed() {
                        output_open = false;
                        on_output(&mut output);
                        tracing::debug!(pid = ?self.pid, "PTY output reached EOF");
                    }
                }
            }
        }
    }
}

/// Forward whatever the reader thread still produces after exit. Ends at EOF,
/// or after a quiet period when a grandchild keeps the slave side open.
async fn drain_until_eof<F>(output: &mut OutputReader, on_output: &mut F)
where
    F: FnMut(&mut OutputReader) + Send,
{
    on_output(output);
    while !output.is_closed() {
        match tokio::time::timeout(EXIT_DRAIN_GRACE, output.ready()).await {
            Ok(_) => on_output(output),
            Err(_) => return,
        }
    }
    // Let the consumer observe `Drain::Closed`.
    on_output(output);
}

/// SIGKILL the child. Only called while its wait is still pending, so the
/// pid cannot have been reused.
#[cfg(unix)]
fn force_kill(pid: Option<u32>) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pid, "SIGKILL failed: {e}");
    }
}

/// portable-pty terminates the process outright off Unix.
#[cfg(not(unix))]
fn force_kill(_pid: Option<u32>) {}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // Never run: make sure the child does not outlive its session.
        let Some(mut child) = self.child.take() else {
            return;
        };
        // Escalates to SIGKILL itself after a short SIGHUP grace period.
        if let Err(e) = child.kill() {
            tracing::debug!(pid = ?self.pid, "PTY kill error (may already be dead): {e}");
        }
        for _ in 0..DROP_REAP_ATTEMPTS {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    tracing::debug!(pid = ?self.pid, "PTY reap error: {e}");
                    return;
                }
            }
        }
        tracing::debug!(pid = ?self.pid, "Dropped child not reaped yet");
    }
}

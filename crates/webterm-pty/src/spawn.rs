//! PTY spawn logic: open a PTY pair and start the launch spec's command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use portable_pty::{native_pty_system, CommandBuilder};

use crate::descriptor::PtyInput;
use crate::output::OutputReader;
use crate::process::ProcessHandle;
use crate::types::{PtyError, WindowSize};

/// Get the user's default shell: `$SHELL`, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

/// What to run under the PTY and how.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Complete child environment. Nothing else is inherited.
    pub env: BTreeMap<String, String>,
    pub size: WindowSize,
}

impl LaunchSpec {
    /// A spec for `program` with no arguments, an empty environment and the
    /// default 80x24 size.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            size: WindowSize::default(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Copy the named variables from the server's own environment, when set.
    #[must_use]
    pub fn inherit_env<'a>(mut self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        for key in keys {
            if let Ok(val) = std::env::var(key) {
                self.env.insert(key.to_string(), val);
            }
        }
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: WindowSize) -> Self {
        self.size = size;
        self
    }

    fn command(&self) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(&self.args);
        cmd.env_clear();
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.cwd(cwd);
        }
        cmd
    }
}

/// A child process attached to a freshly opened PTY.
pub struct TerminalProcess {
    input: PtyInput,
    output: OutputReader,
    process: ProcessHandle,
}

impl TerminalProcess {
    /// Open a PTY of `spec.size`, spawn the command on its slave side and
    /// start the output reader thread.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(spec.size.into())
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let child = pair
            .slave
            .spawn_command(spec.command())
            .map_err(|e| PtyError::SpawnFailed(format!("'{}': {e}", spec.program)))?;

        // Only the child keeps the slave open, so reads hit EOF when it exits.
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take PTY writer: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone PTY reader: {e}")))?;

        let output = OutputReader::spawn_reader(reader)?;
        let process = ProcessHandle::new(child);

        tracing::info!(
            program = %spec.program,
            pid = ?process.pid(),
            rows = spec.size.rows,
            cols = spec.size.cols,
            "Spawned terminal process"
        );

        Ok(Self {
            input: PtyInput {
                writer,
                master: pair.master,
                size: spec.size,
            },
            output,
            process,
        })
    }

    /// Child process id, if the platform reports one.
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    /// Split into the parts owned by the inbound task, the output forwarder
    /// and the lifecycle task.
    pub fn into_parts(self) -> (PtyInput, OutputReader, ProcessHandle) {
        (self.input, self.output, self.process)
    }
}

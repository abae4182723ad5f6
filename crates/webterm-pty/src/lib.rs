//! Terminal process resource: a child process attached to a pseudo-terminal.
//!
//! [`TerminalProcess::spawn`] opens a PTY with `portable-pty`, starts the
//! command on its slave side and splits the master side into three owned
//! parts so the relay can hand each to a different task:
//!
//! - [`PtyInput`]: keystrokes in, window-size changes ([`PtyDescriptor`]).
//! - [`OutputReader`]: output-ready notification plus a non-blocking drain.
//! - [`ProcessHandle`]: the lifecycle task that completes when the child exits.

mod descriptor;
mod output;
mod process;
mod spawn;
mod types;

pub use descriptor::{PtyDescriptor, PtyInput};
pub use output::{Drain, OutputReader};
pub use process::{ProcessExit, ProcessHandle};
pub use spawn::{default_shell, LaunchSpec, TerminalProcess};
pub use types::{PtyError, WindowSize, DEFAULT_COLS, DEFAULT_ROWS, PTY_READ_CHUNK};

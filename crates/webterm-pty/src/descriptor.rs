//! Input side of the PTY master: keystrokes and window-size changes.

use std::io::Write;

use portable_pty::MasterPty;

use crate::types::{PtyError, WindowSize};

/// The operations the relay performs on the PTY master from the inbound side.
///
/// Implemented by [`PtyInput`] for a real PTY; tests substitute a recorder.
pub trait PtyDescriptor: Send + 'static {
    /// Write `data` verbatim to the child's input.
    fn write(&mut self, data: &[u8]) -> Result<(), PtyError>;

    /// Apply a terminal-size change (`TIOCSWINSZ` on Unix).
    fn resize(&mut self, size: WindowSize) -> Result<(), PtyError>;
}

/// Owned writer plus master handle of a spawned PTY.
pub struct PtyInput {
    pub(crate) writer: Box<dyn Write + Send>,
    pub(crate) master: Box<dyn MasterPty + Send>,
    pub(crate) size: WindowSize,
}

impl PtyInput {
    /// The size most recently applied to the PTY.
    pub fn size(&self) -> WindowSize {
        self.size
    }
}

impl PtyDescriptor for PtyInput {
    fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    fn resize(&mut self, size: WindowSize) -> Result<(), PtyError> {
        self.master
            .resize(size.into())
            .map_err(|e| PtyError::ResizeFailed(e.to_string()))?;
        self.size = size;
        tracing::debug!(rows = size.rows, cols = size.cols, "PTY resized");
        Ok(())
    }
}

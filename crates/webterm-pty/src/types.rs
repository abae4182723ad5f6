//! PTY error and size types.

use portable_pty::PtySize;

/// Maximum bytes read from the PTY master in one syscall (8 KB).
pub const PTY_READ_CHUNK: usize = 8_192;

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 24;

/// Errors originating from PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("failed to resize PTY: {0}")]
    ResizeFailed(String),
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// The four `u16` fields of a `TIOCSWINSZ` request, in kernel order:
    /// rows, cols, then the unused pixel width and height.
    pub fn winsize_fields(&self) -> [u16; 4] {
        [self.rows, self.cols, 0, 0]
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl From<WindowSize> for PtySize {
    fn from(size: WindowSize) -> Self {
        PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winsize_fields_pad_pixels_with_zero() {
        assert_eq!(WindowSize::new(24, 80).winsize_fields(), [24, 80, 0, 0]);
    }

    #[test]
    fn pty_size_conversion_keeps_order() {
        let size: PtySize = WindowSize::new(40, 120).into();
        assert_eq!(size.rows, 40);
        assert_eq!(size.cols, 120);
        assert_eq!(size.pixel_width, 0);
        assert_eq!(size.pixel_height, 0);
    }

    #[test]
    fn default_size_is_80x24() {
        let size = WindowSize::default();
        assert_eq!((size.cols, size.rows), (DEFAULT_COLS, DEFAULT_ROWS));
    }

    #[test]
    fn pty_error_display() {
        let err = PtyError::SpawnFailed("no such file".into());
        assert_eq!(err.to_string(), "failed to spawn process: no such file");
        let err = PtyError::ResizeFailed("EBADF".into());
        assert_eq!(err.to_string(), "failed to resize PTY: EBADF");
    }
}

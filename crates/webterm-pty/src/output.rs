//! Output side of the PTY master.
//!
//! A background thread performs the blocking reads and pushes each chunk
//! onto an unbounded channel. A chunk arriving is the output-ready
//! notification; [`OutputReader::drain`] then empties the channel without
//! blocking so everything available is forwarded as one unit.

use std::io::Read;

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::types::PTY_READ_CHUNK;

/// Result of one drain cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum Drain {
    /// Everything that was available, concatenated in read order.
    Data(Vec<u8>),
    /// Nothing available right now.
    Empty,
    /// The reader hit EOF or a read error and nothing is left.
    Closed,
}

/// Receiving end of the PTY output channel.
pub struct OutputReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Chunk consumed by [`OutputReader::ready`] but not yet drained.
    pending: Option<Vec<u8>>,
    closed: bool,
}

impl OutputReader {
    /// Wrap a channel fed with PTY output chunks.
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: None,
            closed: false,
        }
    }

    /// Start the blocking reader thread for `reader` and return its receiver.
    pub(crate) fn spawn_reader(mut reader: Box<dyn Read + Send>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();

        std::thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || {
                let mut buf = [0u8; PTY_READ_CHUNK];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break, // EOF: child side closed
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break; // Receiver dropped
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            // Linux reports EIO once the slave is closed.
                            tracing::debug!("PTY reader stopped: {e}");
                            break;
                        }
                    }
                }
            })?;

        Ok(Self::new(rx))
    }

    /// Wait until output is available.
    ///
    /// Returns `false` once the reader has closed and nothing is pending.
    /// Cancel-safe: a chunk received here is kept for the next drain.
    pub async fn ready(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        if self.closed {
            return false;
        }
        match self.rx.recv().await {
            Some(chunk) => {
                self.pending = Some(chunk);
                true
            }
            None => {
                self.closed = true;
                false
            }
        }
    }

    /// Take everything currently available without waiting.
    pub fn drain(&mut self) -> Drain {
        let mut buf = self.pending.take().unwrap_or_default();

        loop {
            match self.rx.try_recv() {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        if !buf.is_empty() {
            Drain::Data(buf)
        } else if self.closed {
            Drain::Closed
        } else {
            Drain::Empty
        }
    }

    /// Whether the reader has reached EOF.
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_none()
    }
}

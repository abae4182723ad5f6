//! PTY output → browser: one outbound text frame per drain cycle.

use webterm_pty::{Drain, OutputReader};

use crate::transport::Outbound;

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two drain cycles is held back until
/// its remaining bytes arrive. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush an incomplete trailing sequence at end of output.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// The output-ready callback of a session.
pub struct OutputForwarder {
    outbound: Outbound,
    decoder: Utf8Decoder,
}

impl OutputForwarder {
    pub fn new(outbound: Outbound) -> Self {
        Self {
            outbound,
            decoder: Utf8Decoder::default(),
        }
    }

    /// Run one drain cycle: take everything available and queue it as a
    /// single outbound message. Never waits on the transport.
    pub fn on_output_ready(&mut self, reader: &mut OutputReader) {
        let text = match reader.drain() {
            Drain::Data(bytes) => {
                tracing::trace!(bytes = bytes.len(), "Drained PTY output");
                self.decoder.decode(&bytes)
            }
            Drain::Empty => return,
            Drain::Closed => self.decoder.finish(),
        };
        if text.is_empty() {
            return;
        }
        if !self.outbound.send(text) {
            tracing::trace!("Outbound writer gone, dropping PTY output");
        }
    }
}

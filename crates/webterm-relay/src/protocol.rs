//! In-band wire protocol between the browser terminal and the relay.
//!
//! Binary frames carry raw keystrokes, except the single byte `0x03` which
//! ends the session. Text frames carry JSON control commands; the only one
//! understood is `{"rows": r, "cols": c}`.

use std::borrow::Cow;
use std::fmt::Write as _;

use serde_json::Value;
use webterm_pty::WindowSize;

/// Binary payload that ends the session instead of being forwarded (ETX, Ctrl-C).
pub const INTERRUPT: &[u8] = &[0x03];

/// A message received from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("control frame is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
}

/// A frame after classification, evaluated once on receipt.
#[derive(Debug)]
pub enum InboundMessage {
    /// The interrupt sentinel: end the inbound side of the session.
    Interrupt,
    /// Keystrokes to write verbatim to the PTY.
    Input(Vec<u8>),
    /// Terminal size change.
    Resize(WindowSize),
    /// Well-formed control text with no recognized command.
    Ignored,
    /// Control text that is not JSON.
    Malformed(ProtocolError),
}

impl InboundMessage {
    pub fn classify(frame: Frame) -> Self {
        match frame {
            Frame::Binary(bytes) if bytes == INTERRUPT => InboundMessage::Interrupt,
            Frame::Binary(bytes) => InboundMessage::Input(bytes),
            Frame::Text(text) => match ControlCommand::parse(&text) {
                Ok(Some(ControlCommand::Resize(size))) => InboundMessage::Resize(size),
                Ok(None) => InboundMessage::Ignored,
                Err(e) => InboundMessage::Malformed(e),
            },
        }
    }
}

/// Structured form of a text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Resize(WindowSize),
}

impl ControlCommand {
    /// Parse a control frame.
    ///
    /// Parsing is lenient: raw control characters inside string literals
    /// are accepted. Valid JSON that does not carry both `rows` and `cols`
    /// as integers in `0..=65535` yields `Ok(None)`. Only top-level object
    /// keys count: a JSON string or array that merely mentions `rows` and
    /// `cols` is not a resize.
    pub fn parse(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(&escape_control_chars(text))?;

        let (Some(rows), Some(cols)) = (value.get("rows"), value.get("cols")) else {
            return Ok(None);
        };

        match (as_dimension(rows), as_dimension(cols)) {
            (Some(rows), Some(cols)) => Ok(Some(ControlCommand::Resize(WindowSize::new(rows, cols)))),
            _ => {
                tracing::debug!(%rows, %cols, "Ignoring resize with unusable dimensions");
                Ok(None)
            }
        }
    }
}

fn as_dimension(value: &Value) -> Option<u16> {
    value.as_u64().and_then(|n| u16::try_from(n).ok())
}

/// Escape raw U+0000..U+001F inside JSON string literals so `serde_json`
/// accepts them. Text outside strings is left alone.
fn escape_control_chars(text: &str) -> Cow<'_, str> {
    if !text.bytes().any(|b| b < 0x20) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if (c as u32) < 0x20 {
                let _ = write!(out, "\\u{:04x}", c as u32);
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

//! xterm.js widget options.

use serde::{Deserialize, Serialize};

/// Initialization options for the browser-side xterm.js widget.
///
/// The relay never interprets these; they are handed to whatever renders
/// the page so it can construct the terminal widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XtermOptions {
    pub cursor_blink: bool,
    pub mac_option_is_meta: bool,
    /// Lines kept in the widget's scrollback (valid range: 0-1_000_000).
    pub scrollback: u32,
}

impl XtermOptions {
    /// The options as the object literal passed to `new Terminal(...)`.
    pub fn to_client_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cursorBlink": self.cursor_blink,
            "macOptionIsMeta": self.mac_option_is_meta,
            "scrollback": self.scrollback,
        })
    }
}

impl Default for XtermOptions {
    fn default() -> Self {
        Self {
            cursor_blink: true,
            mac_option_is_meta: false,
            scrollback: 5000,
        }
    }
}

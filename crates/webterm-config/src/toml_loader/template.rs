//! Commented default config written on first run.

pub(super) fn default_config_toml() -> &'static str {
    r##"# webterm configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "127.0.0.1"
# port = 8022
# path = "/"             # WebSocket upgrades on other paths get 404

[process]
# program = ""           # empty: $SHELL, then /bin/sh
# args = []
# working_directory = "/home/me"
# term = "xterm-256color"
# initial_cols = 80      # 1-1000
# initial_rows = 24      # 1-1000
# inherit_env = ["HOME", "USER", "LOGNAME", "SHELL", "PATH", "LANG", "LC_ALL", "LC_CTYPE", "TMPDIR"]

[process.env]
# EDITOR = "vi"

[relay]
# strict_control = false # true: a non-JSON text frame ends the session
# flush_timeout_ms = 500 # 0-60000

[xterm]
# cursor_blink = true
# mac_option_is_meta = false
# scrollback = 5000      # 0-1000000

[logging]
# level = "info"         # trace, debug, info, warn, error
"##
}

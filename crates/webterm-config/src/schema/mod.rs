//! Configuration schema types for webterm.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod process;
mod relay;
mod server;
mod xterm;

pub use logging::*;
pub use process::*;
pub use relay::*;
pub use server::*;
pub use xterm::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for webterm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebtermConfig {
    pub server: ServerConfig,
    pub process: ProcessConfig,
    pub relay: RelayConfig,
    pub xterm: XtermOptions,
    pub logging: LoggingConfig,
}

//! Full configuration validation.
//!
//! Checks numeric ranges and a few string invariants, collecting every
//! problem into a single `ConfigError`.

mod helpers;


use crate::schema::WebtermConfig;
use helpers::validate_range;
use webterm_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &WebtermConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_process(&mut errors, config);
    validate_range(
        &mut errors,
        "relay.flush_timeout_ms",
        config.relay.flush_timeout_ms,
        0,
        60_000,
    );
    validate_range(
        &mut errors,
        "xterm.scrollback",
        u64::from(config.xterm.scrollback),
        0,
        1_000_000,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &WebtermConfig) {
    if config.server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
    if !config.server.path.starts_with('/') {
        errors.push(format!(
            "server.path = {:?} must start with '/'",
            config.server.path
        ));
    }
}

fn validate_process(errors: &mut Vec<String>, config: &WebtermConfig) {
    let process = &config.process;
    validate_range(errors, "process.initial_cols", u64::from(process.initial_cols), 1, 1000);
    validate_range(errors, "process.initial_rows", u64::from(process.initial_rows), 1, 1000);
    if process.term.is_empty() {
        errors.push("process.term must not be empty".into());
    }
    for key in process.env.keys() {
        if key.is_empty() || key.contains('=') {
            errors.push(format!("process.env key {key:?} is not a valid variable name"));
        }
    }
}

//! webterm-relay: serve a terminal process to an xterm.js page over WebSocket.
//!
//! Every accepted connection gets its own child process on a fresh PTY.
//! Keystrokes arrive as binary frames, resize commands as JSON text frames,
//! and terminal output is sent back as UTF-8 text frames.

mod connection;
mod forward;
mod protocol;
mod session;
mod transport;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;
use webterm_config::{config_to_json, load_config, validation, LogLevel, WebtermConfig};

use crate::connection::{handle_connection, ConnectionContext};

#[derive(Parser, Debug)]
#[command(name = "webterm-relay", about = "WebSocket relay between xterm.js and a PTY")]
struct Args {
    /// Config file (default: <config dir>/webterm/config.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, overriding `server.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Print the xterm.js constructor options as JSON and exit.
    #[arg(long)]
    print_xterm_options: bool,

    /// Command to run instead of the configured program.
    #[arg(last = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // The configured level is not known yet; loader warnings still need a sink.
    let bootstrap = bootstrap_subscriber(std::io::stderr);
    let config = match tracing::subscriber::with_default(bootstrap, || load(&args)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("webterm-relay: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        println!("{}", config_to_json(&config));
        return ExitCode::SUCCESS;
    }
    if args.print_xterm_options {
        println!("{}", config.xterm.to_client_json());
        return ExitCode::SUCCESS;
    }

    init_tracing(config.logging.level);

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "webterm-relay stopped");
            ExitCode::FAILURE
        }
    }
}

/// Subscriber used only while the config file is loaded.
fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webterm_config=info".into()),
        )
        .with_writer(writer)
        .finish()
}

fn init_tracing(level: LogLevel) {
    let level = level.as_str();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("webterm_relay={level},webterm_pty={level},webterm_config={level}").into()
            }),
        )
        .init();
}

fn load(args: &Args) -> webterm_common::Result<WebtermConfig> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    validation::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut WebtermConfig, args: &Args) {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some((program, rest)) = args.command.split_first() {
        config.process.program = program.clone();
        config.process.args = rest.to_vec();
    }
}

async fn serve(config: WebtermConfig) -> webterm_common::Result<()> {
    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("webterm-relay listening on ws://{}{}", addr, config.server.path);

    let ctx = Arc::new(ConnectionContext::from_config(&config));

    // Accept loop.
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(handle_connection(stream, addr, ctx));
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

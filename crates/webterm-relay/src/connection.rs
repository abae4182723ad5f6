//! Per-connection handler: handshake, spawn the terminal, relay until done.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_util::sync::CancellationToken;
use webterm_common::SessionId;
use webterm_config::{ProcessConfig, WebtermConfig};
use webterm_pty::{default_shell, LaunchSpec, TerminalProcess, WindowSize};

use crate::session::{RelayPolicy, Session};
use crate::transport::{write_loop, Outbound, WsTransport};

/// Settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub path: String,
    pub process: ProcessConfig,
    pub policy: RelayPolicy,
    pub flush_timeout: Duration,
}

impl ConnectionContext {
    pub fn from_config(config: &WebtermConfig) -> Self {
        Self {
            path: config.server.path.clone(),
            process: config.process.clone(),
            policy: RelayPolicy {
                strict_control: config.relay.strict_control,
            },
            flush_timeout: Duration::from_millis(config.relay.flush_timeout_ms),
        }
    }
}

/// Build the launch spec for one connection's child process.
pub fn launch_spec(config: &ProcessConfig) -> LaunchSpec {
    let program = if config.program.is_empty() {
        default_shell()
    } else {
        config.program.clone()
    };

    let mut spec = LaunchSpec::new(program)
        .with_args(config.args.iter().cloned())
        .inherit_env(config.inherit_env.iter().map(String::as_str))
        .with_env("TERM", config.term.as_str())
        .with_size(WindowSize::new(config.initial_rows, config.initial_cols));

    for (key, value) in &config.env {
        spec = spec.with_env(key.as_str(), value.as_str());
    }

    // portable-pty falls back to $HOME, so pin the server's own directory.
    let cwd = config
        .working_directory
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok());
    if let Some(cwd) = cwd {
        spec = spec.with_cwd(cwd);
    }

    spec
}

/// Whether a handshake request targets the relay endpoint.
fn path_matches(expected: &str, requested: &str) -> bool {
    requested == expected
}

/// Handle a single TCP connection from accept to teardown.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: Arc<ConnectionContext>) {
    let expected = ctx.path.clone();
    let check_path = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if path_matches(&expected, req.uri().path()) {
            Ok(resp)
        } else {
            tracing::debug!(peer = %addr, path = req.uri().path(), "Rejecting unknown path");
            let mut err = ErrorResponse::new(Some("not found".into()));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
    };

    let mut ws = match accept_hdr_async(stream, check_path).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
            return;
        }
    };

    let session_id = SessionId::new();
    let process = match TerminalProcess::spawn(&launch_spec(&ctx.process)) {
        Ok(process) => process,
        Err(e) => {
            tracing::warn!(peer = %addr, session = %session_id, error = %e, "Failed to start terminal process");
            let frame = CloseFrame {
                code: CloseCode::Error,
                reason: "failed to start terminal process".into(),
            };
            let _ = ws.close(Some(frame)).await;
            return;
        }
    };

    tracing::info!(
        peer = %addr,
        session = %session_id,
        pid = ?process.pid(),
        "Client connected"
    );

    let (sink, stream) = ws.split();
    let (outbound, rx) = Outbound::channel();
    let writer_cancel = CancellationToken::new();
    let writer = tokio::spawn(write_loop(
        sink,
        rx,
        writer_cancel.clone(),
        ctx.flush_timeout,
    ));

    let (input, output, handle) = process.into_parts();
    let end = Session::new(
        session_id.clone(),
        WsTransport::new(stream),
        outbound,
        input,
        output,
        handle,
    )
    .with_policy(ctx.policy.clone())
    .run()
    .await;

    writer_cancel.cancel();
    if let Err(e) = writer.await {
        tracing::debug!(session = %session_id, error = %e, "Writer task failed");
    }

    tracing::info!(
        peer = %addr,
        session = %session_id,
        first = ?end.first,
        "Client disconnected"
    );
}

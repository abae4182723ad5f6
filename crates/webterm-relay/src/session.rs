//! Relay engine: one browser connection paired with one terminal process.
//!
//! Two tasks run per session. The inbound task reads frames from the
//! transport and writes keystrokes or resizes to the PTY. The lifecycle task
//! waits for the child to exit and, on every output-ready notification,
//! drains the PTY and queues one outbound frame. Whichever task finishes
//! first ends the session: the other is asked to cancel, both are awaited,
//! and only then is the PTY released.

use tokio_util::sync::CancellationToken;
use webterm_common::SessionId;
use webterm_pty::{OutputReader, ProcessExit, ProcessHandle, PtyDescriptor};

use crate::forward::OutputForwarder;
use crate::protocol::InboundMessage;
use crate::transport::{Outbound, Transport};

/// Per-session relay policy.
#[derive(Debug, Clone, Default)]
pub struct RelayPolicy {
    /// End the inbound task on a text frame that is not JSON.
    pub strict_control: bool,
}

/// Why the inbound task stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnd {
    /// The browser sent the interrupt sentinel.
    Interrupted,
    /// The transport channel closed.
    TransportClosed,
    /// Writing or resizing failed; the child side is gone.
    PtyClosed(String),
    /// A malformed control frame under strict policy.
    MalformedControl(String),
    /// Cancelled because the process finished first.
    Cancelled,
    /// The task panicked.
    Aborted(String),
}

/// Which side of the session finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Inbound,
    Process,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub first: Side,
    pub inbound: InboundEnd,
    pub process: ProcessExit,
}

pub struct Session<T, P> {
    id: SessionId,
    transport: T,
    outbound: Outbound,
    input: P,
    output: OutputReader,
    process: ProcessHandle,
    policy: RelayPolicy,
}

impl<T: Transport, P: PtyDescriptor> Session<T, P> {
    pub fn new(
        id: SessionId,
        transport: T,
        outbound: Outbound,
        input: P,
        output: OutputReader,
        process: ProcessHandle,
    ) -> Self {
        Self {
            id,
            transport,
            outbound,
            input,
            output,
            process,
            policy: RelayPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RelayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Relay until either side finishes, then tear both down.
    pub async fn run(self) -> SessionEnd {
        let Session {
            id,
            mut transport,
            outbound,
            mut input,
            output,
            process,
            policy,
        } = self;

        let inbound_cancel = CancellationToken::new();
        let process_cancel = CancellationToken::new();

        let mut inbound = tokio::spawn({
            let id = id.clone();
            let cancel = inbound_cancel.clone();
            async move {
                let end = inbound_loop(&id, &mut transport, &mut input, &policy, &cancel).await;
                (end, input)
            }
        });

        let mut forwarder = OutputForwarder::new(outbound);
        let mut lifecycle = tokio::spawn(process.run(
            output,
            process_cancel.clone(),
            move |reader: &mut OutputReader| forwarder.on_output_ready(reader),
        ));

        let cancel_both = || {
            inbound_cancel.cancel();
            process_cancel.cancel();
        };
        let (first, inbound_res, process_res) = tokio::select! {
            res = &mut inbound => {
                cancel_both();
                (Side::Inbound, res, lifecycle.await)
            }
            res = &mut lifecycle => {
                cancel_both();
                (Side::Process, inbound.await, res)
            }
        };

        let inbound_end = match inbound_res {
            Ok((end, input)) => {
                drop(input);
                end
            }
            Err(e) => InboundEnd::Aborted(e.to_string()),
        };
        let process_exit = process_res.unwrap_or_else(|e| ProcessExit::Unknown(e.to_string()));

        tracing::info!(
            session = %id,
            first = ?first,
            inbound = ?inbound_end,
            process = ?process_exit,
            "Session ended"
        );

        SessionEnd {
            first,
            inbound: inbound_end,
            process: process_exit,
        }
    }
}

/// Task A: process inbound frames strictly in arrival order.
pub(crate) async fn inbound_loop<T: Transport, P: PtyDescriptor>(
    id: &SessionId,
    transport: &mut T,
    pty: &mut P,
    policy: &RelayPolicy,
    cancel: &CancellationToken,
) -> InboundEnd {
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return InboundEnd::Cancelled,
            frame = transport.receive() => frame,
        };
        let Some(frame) = frame else {
            tracing::debug!(session = %id, "Transport closed");
            return InboundEnd::TransportClosed;
        };

        match InboundMessage::classify(frame) {
            InboundMessage::Interrupt => {
                tracing::info!(session = %id, "Interrupt received");
                return InboundEnd::Interrupted;
            }
            InboundMessage::Input(bytes) => {
                if let Err(e) = pty.write(&bytes) {
                    tracing::debug!(session = %id, error = %e, "PTY write failed");
                    return InboundEnd::PtyClosed(e.to_string());
                }
            }
            InboundMessage::Resize(size) => {
                if let Err(e) = pty.resize(size) {
                    tracing::debug!(session = %id, error = %e, "PTY resize failed");
                    return InboundEnd::PtyClosed(e.to_string());
                }
            }
            InboundMessage::Ignored => {
                tracing::debug!(session = %id, "Ignoring unrecognized control frame");
            }
            InboundMessage::Malformed(e) => {
                if policy.strict_control {
                    tracing::debug!(session = %id, error = %e, "Malformed control frame");
                    return InboundEnd::MalformedControl(e.to_string());
                }
                tracing::debug!(session = %id, error = %e, "Ignoring malformed control frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use webterm_pty::{LaunchSpec, PtyError, TerminalProcess, WindowSize};

    use super::*;
    use crate::protocol::Frame;
    use crate::transport::testing::ScriptedTransport;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum PtyOp {
        Write(Vec<u8>),
        Resize([u16; 4]),
    }

    #[derive(Clone, Default)]
    struct RecordingPty {
        ops: Arc<Mutex<Vec<PtyOp>>>,
        closed: bool,
    }

    impl RecordingPty {
        fn ops(&self) -> Vec<PtyOp> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl PtyDescriptor for RecordingPty {
        fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
            if self.closed {
                return Err(std::io::Error::from_raw_os_error(9).into());
            }
            self.ops.lock().unwrap().push(PtyOp::Write(data.to_vec()));
            Ok(())
        }

        fn resize(&mut self, size: WindowSize) -> Result<(), PtyError> {
            if self.closed {
                return Err(PtyError::ResizeFailed("closed".into()));
            }
            self.ops
                .lock()
                .unwrap()
                .push(PtyOp::Resize(size.winsize_fields()));
            Ok(())
        }
    }

    fn text(s: &str) -> Frame {
        Frame::Text(s.to_string())
    }

    fn binary(b: &[u8]) -> Frame {
        Frame::Binary(b.to_vec())
    }

    async fn run_inbound(
        frames: Vec<Frame>,
        pty: &mut RecordingPty,
        policy: RelayPolicy,
    ) -> InboundEnd {
        let mut transport = ScriptedTransport::closing(frames);
        inbound_loop(
            &SessionId::new(),
            &mut transport,
            pty,
            &policy,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn binary_frames_are_written_in_order_and_loop_keeps_running() {
        let mut pty = RecordingPty::default();
        let mut transport = ScriptedTransport::open([binary(b"a"), binary(b"bc"), binary(b"\x1b[A")]);
        let cancel = CancellationToken::new();

        let still_running = tokio::time::timeout(
            Duration::from_millis(100),
            inbound_loop(
                &SessionId::new(),
                &mut transport,
                &mut pty,
                &RelayPolicy::default(),
                &cancel,
            ),
        )
        .await
        .is_err();

        assert!(still_running, "inbound task should wait for more frames");
        assert_eq!(
            pty.ops(),
            vec![
                PtyOp::Write(b"a".to_vec()),
                PtyOp::Write(b"bc".to_vec()),
                PtyOp::Write(b"\x1b[A".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn ls_newline_is_written_verbatim() {
        let mut pty = RecordingPty::default();
        let end = run_inbound(vec![binary(b"ls\n")], &mut pty, RelayPolicy::default()).await;
        assert_eq!(end, InboundEnd::TransportClosed);
        assert_eq!(pty.ops(), vec![PtyOp::Write(b"ls\n".to_vec())]);
    }

    #[tokio::test]
    async fn interrupt_ends_loop_without_forwarding() {
        let mut pty = RecordingPty::default();
        let end = run_inbound(
            vec![binary(b"x"), binary(b"\x03"), binary(b"after")],
            &mut pty,
            RelayPolicy::default(),
        )
        .await;
        assert_eq!(end, InboundEnd::Interrupted);
        assert_eq!(pty.ops(), vec![PtyOp::Write(b"x".to_vec())]);
    }

    #[tokio::test]
    async fn resize_command_issues_packed_winsize() {
        let mut pty = RecordingPty::default();
        run_inbound(
            vec![text(r#"{"cols": 80, "rows": 24}"#)],
            &mut pty,
            RelayPolicy::default(),
        )
        .await;
        assert_eq!(pty.ops(), vec![PtyOp::Resize([24, 80, 0, 0])]);
    }

    #[tokio::test]
    async fn repeated_resize_issues_identical_calls() {
        let mut pty = RecordingPty::default();
        let cmd = r#"{"rows": 40, "cols": 132}"#;
        run_inbound(vec![text(cmd), text(cmd)], &mut pty, RelayPolicy::default()).await;
        assert_eq!(
            pty.ops(),
            vec![PtyOp::Resize([40, 132, 0, 0]), PtyOp::Resize([40, 132, 0, 0])]
        );
    }

    #[tokio::test]
    async fn incomplete_resize_is_ignored_and_session_continues() {
        let mut pty = RecordingPty::default();
        let end = run_inbound(
            vec![text(r#"{"rows": 24}"#), text(r#"{"cols": 80}"#), binary(b"ok")],
            &mut pty,
            RelayPolicy::default(),
        )
        .await;
        assert_eq!(end, InboundEnd::TransportClosed);
        assert_eq!(pty.ops(), vec![PtyOp::Write(b"ok".to_vec())]);
    }

    #[tokio::test]
    async fn malformed_control_is_ignored_by_default() {
        let mut pty = RecordingPty::default();
        let end = run_inbound(
            vec![text("garbage"), binary(b"next")],
            &mut pty,
            RelayPolicy::default(),
        )
        .await;
        assert_eq!(end, InboundEnd::TransportClosed);
        assert_eq!(pty.ops(), vec![PtyOp::Write(b"next".to_vec())]);
    }

    #[tokio::test]
    async fn malformed_control_ends_loop_when_strict() {
        let mut pty = RecordingPty::default();
        let end = run_inbound(
            vec![text("garbage"), binary(b"next")],
            &mut pty,
            RelayPolicy {
                strict_control: true,
            },
        )
        .await;
        assert!(matches!(end, InboundEnd::MalformedControl(_)));
        assert!(pty.ops().is_empty());
    }

    #[tokio::test]
    async fn write_failure_ends_loop() {
        let mut pty = RecordingPty {
            closed: true,
            ..Default::default()
        };
        let end = run_inbound(
            vec![binary(b"lost"), binary(b"never")],
            &mut pty,
            RelayPolicy::default(),
        )
        .await;
        assert!(matches!(end, InboundEnd::PtyClosed(_)));
    }

    #[tokio::test]
    async fn cancellation_ends_waiting_loop() {
        let mut pty = RecordingPty::default();
        let mut transport = ScriptedTransport::open([]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = inbound_loop(
            &SessionId::new(),
            &mut transport,
            &mut pty,
            &RelayPolicy::default(),
            &cancel,
        )
        .await;
        assert_eq!(end, InboundEnd::Cancelled);
    }

    fn collect(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> String {
        let mut all = String::new();
        while let Ok(text) = rx.try_recv() {
            all.push_str(&text);
        }
        all
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn interrupt_cancels_running_process() {
        let (input, output, process) = TerminalProcess::spawn(&LaunchSpec::new("/bin/cat"))
            .expect("spawn cat")
            .into_parts();
        let (outbound, _sent) = Outbound::channel();
        let transport = ScriptedTransport::open([binary(b"\x03")]);

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            Session::new(SessionId::new(), transport, outbound, input, output, process).run(),
        )
        .await
        .expect("session should end promptly");

        assert_eq!(end.first, Side::Inbound);
        assert_eq!(end.inbound, InboundEnd::Interrupted);
        assert_eq!(end.process, ProcessExit::Cancelled);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn interrupt_tears_down_child_that_ignores_sighup() {
        let spec = LaunchSpec::new("/bin/sh")
            .with_args(["-c", "trap '' HUP; while true; do read x; done"]);
        let (input, output, process) = TerminalProcess::spawn(&spec)
            .expect("spawn sh")
            .into_parts();
        let (outbound, _sent) = Outbound::channel();
        let transport = ScriptedTransport::open([binary(b"\x03")]);

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            Session::new(SessionId::new(), transport, outbound, input, output, process).run(),
        )
        .await
        .expect("teardown should not wait on a SIGHUP-immune child");

        assert_eq!(end.inbound, InboundEnd::Interrupted);
        assert_eq!(end.process, ProcessExit::Cancelled);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn process_exit_cancels_inbound_and_forwards_output() {
        let spec = LaunchSpec::new("/bin/sh")
            .with_args(["-c", "read line; printf 'got:%s' \"$line\""]);
        let (input, output, process) = TerminalProcess::spawn(&spec)
            .expect("spawn sh")
            .into_parts();
        let (outbound, mut sent) = Outbound::channel();
        let transport = ScriptedTransport::open([binary(b"ls\n")]);

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            Session::new(SessionId::new(), transport, outbound, input, output, process).run(),
        )
        .await
        .expect("session should end when the process exits");

        assert_eq!(end.first, Side::Process);
        assert_eq!(end.process, ProcessExit::Exited { code: 0 });
        assert_eq!(end.inbound, InboundEnd::Cancelled);
        assert!(collect(&mut sent).contains("got:ls"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn resize_reaches_the_child_terminal() {
        let spec = LaunchSpec::new("/bin/sh")
            .inherit_env(["PATH"])
            .with_args(["-c", "read go; stty size"]);
        let (input, output, process) = TerminalProcess::spawn(&spec)
            .expect("spawn sh")
            .into_parts();
        let (outbound, mut sent) = Outbound::channel();
        let transport = ScriptedTransport::open([
            text(r#"{"cols": 100, "rows": 33}"#),
            binary(b"\n"),
        ]);

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            Session::new(SessionId::new(), transport, outbound, input, output, process).run(),
        )
        .await
        .expect("session should end when the process exits");

        assert_eq!(end.first, Side::Process);
        assert!(collect(&mut sent).contains("33 100"));
    }
}

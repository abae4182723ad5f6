//! Message-channel abstraction over the browser WebSocket.
//!
//! Inbound frames are pulled with [`Transport::receive`]. Outbound text goes
//! through [`Outbound::send`], which only queues: a single writer task owns
//! the socket sink and sends queued frames in order.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::protocol::Frame;

/// Receiving half of the transport channel.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Next frame from the browser, or `None` once the channel is closed.
    ///
    /// Must be cancel-safe: the inbound loop races it against cancellation.
    async fn receive(&mut self) -> Option<Frame>;
}

/// Fire-and-forget sender for outbound text frames.
#[derive(Clone, Debug)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbound {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `text` for sending. Returns `false` if the writer is gone.
    pub fn send(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }
}

/// Inbound side of an accepted WebSocket.
pub struct WsTransport {
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

impl WsTransport {
    pub fn new(stream: SplitStream<WebSocketStream<TcpStream>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn receive(&mut self) -> Option<Frame> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(data)) => return Some(Frame::Binary(data.to_vec())),
                Ok(Message::Text(text)) => return Some(Frame::Text(text.to_string())),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite on the next write.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "WS receive error");
                    return None;
                }
            }
        }
    }
}

/// Send queued outbound frames until the queue closes or `cancel` fires.
///
/// After cancellation, whatever is already queued is still flushed for up
/// to `flush_timeout`; then the socket is closed.
pub async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    flush_timeout: Duration,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        tracing::debug!(error = %e, "WS send failed");
                        return;
                    }
                }
                None => break,
            },
        }
    }

    let flush = async {
        rx.close();
        while let Some(text) = rx.recv().await {
            sink.feed(Message::Text(text.into())).await?;
        }
        sink.close().await
    };
    match tokio::time::timeout(flush_timeout, flush).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "WS close failed"),
        Err(_) => tracing::debug!("Gave up flushing output at teardown"),
    }
}

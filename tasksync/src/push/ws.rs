//! WebSocket push stream.
//!
//! Each text frame is one JSON [`TaskEvent`] (`{"event": ..., "data": ...}`).
//! A background reader task decodes frames and hands events to the
//! stream through a channel. Malformed frames are logged and skipped;
//! the connection is not dropped for bad data.

use std::time::Duration;

use futures_util::StreamExt;
use tasksync_proto::codec;
use tasksync_proto::event::TaskEvent;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{EventSource, EventStream, PushError};

/// Read half of a client WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Buffered events between the reader task and the consumer.
const EVENT_BUFFER: usize = 256;

/// Connects to a push endpoint over WebSocket.
#[derive(Debug, Clone)]
pub struct WsEventSource {
    url: String,
    connect_timeout: Duration,
}

impl WsEventSource {
    /// Source for `url` (`ws://` or `wss://`).
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }
}

impl EventSource for WsEventSource {
    type Stream = WsEventStream;

    async fn connect(&self) -> Result<WsEventStream, PushError> {
        WsEventStream::connect(&self.url, self.connect_timeout).await
    }
}

/// An open WebSocket push connection.
pub struct WsEventStream {
    incoming: mpsc::Receiver<TaskEvent>,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl WsEventStream {
    /// Connects to `url` and starts the reader task.
    ///
    /// # Errors
    ///
    /// [`PushError::Timeout`] if the handshake does not finish within
    /// `timeout`, [`PushError::Connect`] if it fails.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, PushError> {
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "push WebSocket connect timed out");
                PushError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "push WebSocket connect failed");
                PushError::Connect(e.to_string())
            })?;

        // The client never writes; the sink half is dropped.
        let (_sink, reader) = ws_stream.split();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader_handle = tokio::spawn(reader_loop(reader, tx));
        tracing::info!(url, "push stream connected");

        Ok(Self {
            incoming: rx,
            reader_handle,
        })
    }
}

impl EventStream for WsEventStream {
    async fn next_event(&mut self) -> Result<TaskEvent, PushError> {
        self.incoming.recv().await.ok_or(PushError::Closed)
    }
}

impl Drop for WsEventStream {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

/// Reads frames until the socket closes or the consumer goes away.
async fn reader_loop(mut reader: WsReader, tx: mpsc::Sender<TaskEvent>) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match codec::decode_event(text.as_str()) {
                Ok(event) => {
                    tracing::debug!(event = event.name(), task_id = %event.task_id(), "push event");
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed push frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("push WebSocket closed by server");
                break;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!("ignoring binary push frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(err = %e, "push WebSocket read error");
                break;
            }
        }
    }
    tracing::info!("push reader task exiting");
}

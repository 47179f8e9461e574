//! Push channel carrying live task events.
//!
//! An [`EventSource`] opens connections; each connection is an
//! [`EventStream`] yielding decoded [`TaskEvent`]s until it closes.
//! Implementations:
//! - [`ws::WsEventSource`]: WebSocket, one JSON event per text frame
//! - [`loopback::LoopbackSource`]: in-process channels for tests

pub mod loopback;
pub mod ws;

use std::future::Future;

use tasksync_proto::event::TaskEvent;

/// Errors from the push channel.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The connection ended (server close, read error or dropped peer).
    #[error("push stream closed")]
    Closed,

    /// Connecting took longer than the configured timeout.
    #[error("push connect timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("push connect failed: {0}")]
    Connect(String),
}

/// One open push connection.
pub trait EventStream: Send {
    /// Waits for the next event.
    ///
    /// Malformed frames are skipped by implementations, never surfaced.
    ///
    /// # Errors
    ///
    /// [`PushError::Closed`] once the connection has ended; the stream
    /// is unusable afterwards.
    fn next_event(&mut self) -> impl Future<Output = Result<TaskEvent, PushError>> + Send;
}

/// Opens push connections. Called again on every reconnect.
pub trait EventSource: Send + Sync {
    /// Stream type produced by [`connect`](Self::connect).
    type Stream: EventStream + 'static;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// [`PushError::Timeout`] or [`PushError::Connect`] when the
    /// connection cannot be established.
    fn connect(&self) -> impl Future<Output = Result<Self::Stream, PushError>> + Send;
}

//! In-process push channel for tests.
//!
//! [`LoopbackSource::new`] returns the source plus a [`LoopbackHub`].
//! Each [`LoopbackHub::open`] hands the next `connect()` call a fresh
//! stream and returns the publisher for it; dropping the publisher closes
//! that stream, which is how tests simulate a dropped connection.

use tasksync_proto::event::TaskEvent;
use tokio::sync::{Mutex, mpsc};

use super::{EventSource, EventStream, PushError};

/// Channel-backed stream.
#[derive(Debug)]
pub struct LoopbackEventStream {
    rx: mpsc::Receiver<TaskEvent>,
}

impl EventStream for LoopbackEventStream {
    async fn next_event(&mut self) -> Result<TaskEvent, PushError> {
        self.rx.recv().await.ok_or(PushError::Closed)
    }
}

/// Source whose `connect()` waits for the hub to open a connection.
#[derive(Debug)]
pub struct LoopbackSource {
    pending: Mutex<mpsc::UnboundedReceiver<LoopbackEventStream>>,
}

/// Test-side handle for opening connections on a [`LoopbackSource`].
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    streams: mpsc::UnboundedSender<LoopbackEventStream>,
    buffer: usize,
}

impl LoopbackSource {
    /// Creates a source and its hub. `buffer` is the per-connection
    /// event capacity.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, LoopbackHub) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                pending: Mutex::new(rx),
            },
            LoopbackHub {
                streams: tx,
                buffer,
            },
        )
    }
}

impl EventSource for LoopbackSource {
    type Stream = LoopbackEventStream;

    /// Fails with [`PushError::Closed`] once every hub is dropped.
    async fn connect(&self) -> Result<LoopbackEventStream, PushError> {
        self.pending.lock().await.recv().await.ok_or(PushError::Closed)
    }
}

impl LoopbackHub {
    /// Queues a connection for the next `connect()` and returns its
    /// publisher.
    ///
    /// # Errors
    ///
    /// [`PushError::Closed`] if the source has been dropped.
    pub fn open(&self) -> Result<mpsc::Sender<TaskEvent>, PushError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.streams
            .send(LoopbackEventStream { rx })
            .map_err(|_| PushError::Closed)?;
        Ok(tx)
    }
}

//! Outbound halves of the two websocket connections
//!
//! Each connection gets one writer task fed by a bounded channel. Pumps hold a
//! [`Link`] and never touch the sink directly, so frames to one peer are
//! serialized in the order they were queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{Sink, SinkExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::{Leg, RelayError, RelayResult};

/// Queue depth per connection
pub const LINK_BUFFER_SIZE: usize = 256;
/// Bound on queueing the close request behind a full buffer
const CLOSE_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

/// Work item for a writer task
#[derive(Debug, Clone, PartialEq)]
pub enum LinkMessage<T> {
    Send(T),
    Close,
}

/// Cloneable handle for queueing frames to one peer
#[derive(Debug)]
pub struct Link<T> {
    leg: Leg,
    tx: mpsc::Sender<LinkMessage<T>>,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            leg: self.leg,
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Link<T> {
    /// Create a link and the receiver its writer consumes
    pub fn channel(leg: Leg, capacity: usize) -> (Self, mpsc::Receiver<LinkMessage<T>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                leg,
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue one frame
    pub async fn send(&self, message: T) -> RelayResult<()> {
        if self.is_closed() {
            return Err(RelayError::LinkClosed(self.leg));
        }
        self.tx
            .send(LinkMessage::Send(message))
            .await
            .map_err(|_| RelayError::LinkClosed(self.leg))
    }

    /// Ask the writer to close the connection; repeated calls are no-ops
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let close = self.tx.send(LinkMessage::Close);
        let _ = tokio::time::timeout(CLOSE_ENQUEUE_TIMEOUT, close).await;
    }
}

/// Spawn the writer task draining `rx` into `sink`
///
/// Frames are JSON-encoded and wrapped with `into_frame`. `Close` sends
/// `close_frame` and ends the task; so does a dropped channel.
pub fn spawn_writer<T, W, S>(
    leg: Leg,
    mut sink: S,
    mut rx: mpsc::Receiver<LinkMessage<T>>,
    into_frame: fn(String) -> W,
    close_frame: W,
) -> JoinHandle<()>
where
    T: Serialize + Send + 'static,
    W: Send + 'static,
    S: Sink<W> + Unpin + Send + 'static,
    S::Error: std::fmt::Display,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                LinkMessage::Send(payload) => {
                    let text = match serde_json::to_string(&payload) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(leg = %leg, "Failed to serialize outgoing frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(into_frame(text)).await {
                        debug!(leg = %leg, "Writer stopped: {}", e);
                        return;
                    }
                }
                LinkMessage::Close => {
                    if let Err(e) = sink.send(close_frame).await {
                        debug!(leg = %leg, "Close frame not delivered: {}", e);
                    }
                    let _ = sink.close().await;
                    debug!(leg = %leg, "Writer closed connection");
                    return;
                }
            }
        }
        let _ = sink.close().await;
    })
}

/// Owns writer tasks and aborts any still running when dropped
#[derive(Debug, Default)]
pub struct WriterGuard {
    handles: Vec<JoinHandle<()>>,
}

impl WriterGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Wait up to `grace` for writers to flush, then abort the rest
    pub async fn shutdown(mut self, grace: Duration) {
        let handles = std::mem::take(&mut self.handles);
        let deadline = tokio::time::Instant::now() + grace;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
            }
        }
    }
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

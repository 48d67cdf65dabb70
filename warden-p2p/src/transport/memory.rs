//! In-process transport over a duplex pipe.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::FutureExt;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, oneshot};

use super::{Transport, TransportLink};
use crate::error::{P2pError, P2pResult};

/// Buffer size of each direction of the pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Transport whose far end is handed to a [`MemoryListener`].
///
/// Used to embed a node in the same process and to drive the client from
/// tests without spawning anything.
pub struct MemoryTransport {
    peers: mpsc::UnboundedSender<DuplexStream>,
    lost: parking_lot::Mutex<Option<oneshot::Sender<String>>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Receives the node side of each link opened on a [`MemoryTransport`].
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MemoryListener {
    /// Wait for the next link. Returns `None` once the transport is dropped.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.peers.recv().await
    }
}

impl MemoryTransport {
    /// Create a transport and the listener for its far end.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            peers: tx,
            lost: parking_lot::Mutex::new(None),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        };
        (transport, MemoryListener { peers: rx })
    }

    /// Simulate the node dying underneath the current link.
    pub fn fail(&self, reason: impl Into<String>) {
        if let Some(tx) = self.lost.lock().take() {
            let _ = tx.send(reason.into());
        }
    }

    /// Number of successful `open` calls.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self) -> P2pResult<TransportLink> {
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.peers.send(remote).map_err(|_| P2pError::TransportLost {
            reason: "memory listener dropped".to_string(),
        })?;

        let (lost_tx, lost_rx) = oneshot::channel::<String>();
        *self.lost.lock() = Some(lost_tx);
        self.opens.fetch_add(1, Ordering::SeqCst);

        let (reader, writer) = tokio::io::split(local);
        let lost = async move {
            match lost_rx.await {
                Ok(reason) => reason,
                // Closed normally: never report a loss.
                Err(_) => futures::future::pending().await,
            }
        }
        .boxed();

        Ok(TransportLink {
            reader: Box::new(reader),
            writer: Box::new(writer),
            lost,
        })
    }

    async fn close(&self) -> P2pResult<()> {
        self.lost.lock().take();
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! Byte-stream transports to the local P2P node.
//!
//! A [`Transport`] produces a [`TransportLink`]: a reader, a writer and a
//! signal that fires if the underlying channel dies on its own. The client
//! never cares whether the bytes come from a spawned node process or an
//! in-process pipe.

mod memory;
mod process;

pub use memory::{MemoryListener, MemoryTransport};
pub use process::{NodeProcess, ProcessTransport};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::P2pResult;

/// Read half of a transport link.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of a transport link.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open byte duplex to the node.
pub struct TransportLink {
    /// Frames from the node.
    pub reader: BoxedReader,
    /// Frames to the node.
    pub writer: BoxedWriter,
    /// Resolves with a reason if the transport dies underneath the link.
    /// Never resolves for a link that is closed normally.
    pub lost: BoxFuture<'static, String>,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}

/// Source of links to the node.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bring the node up (if needed) and open a link to it.
    async fn open(&self) -> P2pResult<TransportLink>;

    /// Release everything `open` acquired. Safe to call when nothing is open.
    async fn close(&self) -> P2pResult<()>;
}

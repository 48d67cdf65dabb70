//! Connection state machine.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// No session; `connect` is allowed.
    #[default]
    Disconnected = 0,
    /// Transport opening or handshake in flight.
    Connecting = 1,
    /// Handshake complete, frames flowing.
    Connected = 2,
    /// Teardown in progress.
    Disconnecting = 3,
}

impl ConnectionState {
    /// Check if application messages can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Atomically updated [`ConnectionState`].
#[derive(Debug, Default)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    /// Create a cell holding `state`.
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Current state.
    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move from `from` to `to` if the state is still `from`.
    ///
    /// On failure returns the state actually observed.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| {
                tracing::debug!(from = %from, to = %to, "Connection state transition");
            })
            .map_err(ConnectionState::from_u8)
    }

    /// Unconditionally set the state.
    pub fn store(&self, state: ConnectionState) {
        let previous = ConnectionState::from_u8(self.0.swap(state as u8, Ordering::SeqCst));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state transition");
        }
    }
}

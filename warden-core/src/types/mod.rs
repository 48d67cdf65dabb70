//! Application data carried between agents.

mod peer_message;

pub use peer_message::PeerMessage;

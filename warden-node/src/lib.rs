//! Warden agent library.
//!
//! This library provides the components for building and running the
//! Warden moderation agent. It is used by the `warden-node` binary and can
//! also be used for testing and embedding.

pub mod agent;
pub mod cli;
pub mod config;
pub mod http;
pub mod node;
pub mod responder;
pub mod shutdown;

//! Peer Channel Abstraction
//!
//! The byte transport between a session and its peer. The real transport is
//! a PTY ([`super::process::PtyChannel`]); transcript replay uses
//! [`super::replay::ScriptedPeer`].

use async_trait::async_trait;

use crate::error::Result;

/// Byte-level connection to one running peer
#[async_trait]
pub trait PeerChannel: Send {
    /// Write raw bytes to the peer's input
    ///
    /// # Errors
    /// Returns `ChannelWrite` if the peer has already exited
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Next chunk of the peer's output, or `None` once the output is closed
    ///
    /// Chunks arrive in stream order and may split lines or characters.
    async fn read(&mut self) -> Result<Option<Vec<u8>>>;

    /// Block until the peer terminates and return its exit code
    async fn wait_exit(&mut self) -> Result<u32>;

    /// Short description for logs
    fn describe(&self) -> String;
}

//! Pseudoterminal (PTY) Peer Channels
//!
//! This module starts the peer on a pseudoterminal, so it behaves exactly as
//! when driven interactively, and exposes its byte streams to the session
//! layer. A scripted in-memory peer replays recorded dialogues.

pub mod channel;
pub mod launcher;
pub mod process;
pub mod replay;
pub mod streams;

// Re-exports for convenience
pub use channel::PeerChannel;
pub use launcher::{GpgLauncher, PeerInvocation, PeerLauncher, PROTOCOL_ARGS};
pub use process::{spawn_pty_process, PtyChannel};
pub use replay::{RecordedReply, ReplayLauncher, ReplyLog, Script, ScriptedPeer};
pub use streams::PtyStreams;

//! Core data models for autocard
//!
//! Values that cross module boundaries: the peer process lifecycle, the key
//! identifier threaded between workflows, and secret material.

pub mod key_id;
pub mod peer_process;
pub mod secret;

// Re-exports for convenience
pub use key_id::KeyId;
pub use peer_process::{PeerProcess, PeerState};
pub use secret::Secret;

//! Peer Protocol Matching
//!
//! Pure recognition of the peer's output: status lines on the status
//! descriptor and banner text used by assumption guards. Nothing here
//! blocks; the session feeds buffered output through these types.

pub mod pattern;
pub mod status;

pub use pattern::Pattern;
pub use status::{LocatedToken, PromptKind, StatusParser, StatusToken, DEFAULT_STATUS_PREFIX};

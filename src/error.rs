//! Error types and Result aliases for autocard

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;
use crate::credentials::CredentialError;

/// Result type alias for autocard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], seen through context wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer had already exited when a reply was sent
    ChannelWrite,
    /// An expected prompt, token or banner did not appear in time
    Timeout,
    /// The peer closed its output before producing an expected token
    EndOfStream,
    /// A banner, ordering or prompt check the workflow relies on did not hold
    AssumptionGuard,
    /// The peer exited with a non-zero status after the dialogue completed
    PeerExit,
    /// The peer could not be started
    Spawn,
    /// Configuration could not be loaded or is invalid
    Config,
    /// Credential material was rejected before use
    Credentials,
    /// A reply was refused before it reached the peer
    InvalidReply,
    /// I/O, serialization and other failures
    Other,
}

/// Main error type for autocard
#[derive(Debug)]
pub enum Error {
    // === Channel errors ===
    /// Failed to write to the peer because it already exited
    ChannelWrite {
        reason: String,
    },

    /// Expected output did not arrive before the deadline
    Timeout {
        waiting_for: String,
        duration: Duration,
    },

    /// Peer closed its output first
    EndOfStream {
        waiting_for: String,
    },

    // === Dialogue errors ===
    /// The peer's interactive layout diverged from what the workflow assumes
    AssumptionGuard {
        guard: String,
    },

    /// Peer exited with a failure status
    PeerExit {
        code: u32,
    },

    /// A reply would not have been exactly one input line
    InvalidReply {
        reason: String,
    },

    // === Process errors ===
    /// Failed to create PTY
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to spawn the peer in the PTY
    PeerSpawnFailed {
        command: String,
        reason: String,
    },

    /// Failed to clone PTY reader
    PtyReaderCloneFailed {
        reason: String,
    },

    /// Failed to take PTY writer
    PtyWriterTakeFailed {
        reason: String,
    },

    // === Configuration and credentials ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration rejected
    Config(ConfigError),

    /// PIN or identity rejected
    Credentials(CredentialError),

    // === Context wrappers ===
    /// Failure inside one prompt/reply exchange
    Exchange {
        field: String,
        source: Box<Error>,
    },

    /// Failure at a workflow step
    Step {
        workflow: &'static str,
        index: usize,
        position: String,
        source: Box<Error>,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// JSON errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    /// Generic errors
    Other(String),
}

impl Error {
    /// Classify this error, looking through context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ChannelWrite { .. } => ErrorKind::ChannelWrite,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::EndOfStream { .. } => ErrorKind::EndOfStream,
            Error::AssumptionGuard { .. } => ErrorKind::AssumptionGuard,
            Error::PeerExit { .. } => ErrorKind::PeerExit,
            Error::InvalidReply { .. } => ErrorKind::InvalidReply,
            Error::PtyCreationFailed { .. }
            | Error::PeerSpawnFailed { .. }
            | Error::PtyReaderCloneFailed { .. }
            | Error::PtyWriterTakeFailed { .. } => ErrorKind::Spawn,
            Error::ConfigLoadFailed { .. } | Error::Config(_) | Error::Toml(_) => {
                ErrorKind::Config
            }
            Error::Credentials(_) => ErrorKind::Credentials,
            Error::Exchange { source, .. } | Error::Step { source, .. } => source.kind(),
            Error::Io(_) | Error::Serde(_) | Error::Regex(_) | Error::Other(_) => {
                ErrorKind::Other
            }
        }
    }

    /// The innermost error beneath any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Exchange { source, .. } | Error::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attach the prompt field an exchange was handling
    pub fn in_exchange(self, field: &str) -> Self {
        Error::Exchange {
            field: field.to_string(),
            source: Box::new(self),
        }
    }

    /// Attach the workflow position at which this error surfaced
    pub fn at_step(self, workflow: &'static str, index: usize, position: String) -> Self {
        Error::Step {
            workflow,
            index,
            position,
            source: Box::new(self),
        }
    }

    /// Shorthand for an assumption guard failure
    pub fn guard(guard: impl Into<String>) -> Self {
        Error::AssumptionGuard {
            guard: guard.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ChannelWrite => "channel write error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::EndOfStream => "end of stream",
            ErrorKind::AssumptionGuard => "assumption guard failure",
            ErrorKind::PeerExit => "peer exit failure",
            ErrorKind::Spawn => "spawn failure",
            ErrorKind::Config => "configuration error",
            ErrorKind::Credentials => "credential error",
            ErrorKind::InvalidReply => "invalid reply",
            ErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChannelWrite { reason } => {
                write!(f, "Failed to write to peer: {}", reason)
            }
            Error::Timeout {
                waiting_for,
                duration,
            } => {
                write!(f, "Timed out after {:?} waiting for {}", duration, waiting_for)
            }
            Error::EndOfStream { waiting_for } => {
                write!(f, "Peer closed its output while waiting for {}", waiting_for)
            }
            Error::AssumptionGuard { guard } => {
                write!(f, "Assumption guard failed: {}", guard)
            }
            Error::PeerExit { code } => {
                write!(f, "Peer exited with status {}", code)
            }
            Error::InvalidReply { reason } => {
                write!(f, "Reply not sent: {}", reason)
            }
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "Failed to create PTY for command '{}': {}", command, reason)
            }
            Error::PeerSpawnFailed { command, reason } => {
                write!(f, "Failed to spawn peer '{}': {}", command, reason)
            }
            Error::PtyReaderCloneFailed { reason } => {
                write!(f, "Failed to clone PTY reader: {}", reason)
            }
            Error::PtyWriterTakeFailed { reason } => {
                write!(f, "Failed to take PTY writer: {}", reason)
            }
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::Config(err) => write!(f, "Configuration error: {}", err),
            Error::Credentials(err) => write!(f, "Credential error: {}", err),
            Error::Exchange { field, source } => {
                write!(f, "{} (prompt '{}')", source, field)
            }
            Error::Step {
                workflow,
                index,
                position,
                source,
            } => {
                write!(
                    f,
                    "{} failed at step {} [{}]: {}",
                    workflow, index, position, source
                )
            }
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Exchange { source, .. } | Error::Step { source, .. } => Some(source.as_ref()),
            Error::Config(err) => Some(err),
            Error::Credentials(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Error::Credentials(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

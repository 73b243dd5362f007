//! Configuration for autocard
//!
//! Everything a workflow needs beyond the caller's identity and PINs: how to
//! launch the peer, how long to wait for it, default key parameters, the
//! card's current PINs, and where diagnostic transcripts go. The
//! configuration is passed explicitly to the [`crate::provision::Provisioner`];
//! nothing reads it from process-wide state.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::{validate_pin, PinRole};
use crate::models::Secret;
use crate::protocol::DEFAULT_STATUS_PREFIX;

/// Factory default user PIN of OpenPGP cards
pub const FACTORY_USER_PIN: &str = "123456";

/// Factory default admin PIN of OpenPGP cards
pub const FACTORY_ADMIN_PIN: &str = "12345678";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How the peer is launched
    pub peer: PeerConfig,

    /// Dialogue timing
    pub session: SessionConfig,

    /// Key generation parameters
    pub keygen: KeyGenConfig,

    /// Card PIN defaults
    pub card: CardConfig,

    /// Diagnostic transcripts
    pub transcript: TranscriptConfig,
}

/// Peer invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Program to run
    pub program: String,

    /// GnuPG home directory (`--homedir`), if not the default
    pub homedir: Option<PathBuf>,

    /// Extra arguments placed after the global options
    pub extra_args: Vec<String>,

    /// Extra environment variables for the peer
    pub environment: HashMap<String, String>,

    /// Status line prefix, without brackets
    pub status_prefix: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            program: "gpg2".to_string(),
            homedir: None,
            extra_args: Vec::new(),
            environment: HashMap::new(),
            status_prefix: DEFAULT_STATUS_PREFIX.to_string(),
        }
    }
}

/// Dialogue timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long any single expect may wait
    pub timeout_secs: u64,

    /// How long to wait while the peer generates key material
    pub keygen_timeout_secs: u64,

    /// How often a pending exit wait is reported
    pub exit_report_interval_secs: u64,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn keygen_timeout(&self) -> Duration {
        Duration::from_secs(self.keygen_timeout_secs)
    }

    pub fn exit_report_interval(&self) -> Duration {
        Duration::from_secs(self.exit_report_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            keygen_timeout_secs: 600,
            exit_report_interval_secs: 10,
        }
    }
}

/// Key generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyGenConfig {
    /// RSA size of the primary key and encryption subkey
    pub key_size: u32,

    /// RSA size of the authentication subkey
    pub auth_key_size: u32,

    /// User ID comment
    pub comment: String,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            key_size: 4096,
            auth_key_size: 4096,
            comment: String::new(),
        }
    }
}

/// Card PIN defaults
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Current user PIN, usually the factory default
    pub default_user_pin: String,

    /// Current admin PIN, usually the factory default
    pub default_admin_pin: String,

    /// Digits in a generated user PIN
    pub user_pin_length: usize,

    /// Digits in a generated admin PIN
    pub admin_pin_length: usize,
}

impl CardConfig {
    pub fn user_pin(&self) -> Secret {
        Secret::new(self.default_user_pin.clone())
    }

    pub fn admin_pin(&self) -> Secret {
        Secret::new(self.default_admin_pin.clone())
    }
}

impl std::fmt::Debug for CardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardConfig")
            .field("default_user_pin", &self.user_pin())
            .field("default_admin_pin", &self.admin_pin())
            .field("user_pin_length", &self.user_pin_length)
            .field("admin_pin_length", &self.admin_pin_length)
            .finish()
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            default_user_pin: FACTORY_USER_PIN.to_string(),
            default_admin_pin: FACTORY_ADMIN_PIN.to_string(),
            user_pin_length: 6,
            admin_pin_length: 8,
        }
    }
}

/// Diagnostic transcript settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Copy the peer's output to stderr as it arrives
    pub mirror: bool,

    /// Directory that receives the transcript of a failed session
    pub directory: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to parse {format} config: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Failed to serialize config as {format}: {reason}")]
    Serialize { format: &'static str, reason: String },

    #[error("Configuration file not found")]
    NotFound,
}

impl Config {
    /// Check values the workflows rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "peer.program",
                reason: "Peer program cannot be empty".to_string(),
            });
        }

        if self.peer.status_prefix.trim().is_empty()
            || self.peer.status_prefix.contains(char::is_whitespace)
        {
            return Err(ConfigError::Invalid {
                field: "peer.status_prefix",
                reason: "Status prefix must be a single non-empty word".to_string(),
            });
        }

        if self.session.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.timeout_secs",
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.session.keygen_timeout_secs < self.session.timeout_secs {
            return Err(ConfigError::Invalid {
                field: "session.keygen_timeout_secs",
                reason: "Key generation timeout cannot be shorter than the dialogue timeout"
                    .to_string(),
            });
        }

        if self.session.exit_report_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.exit_report_interval_secs",
                reason: "Report interval must be greater than 0".to_string(),
            });
        }

        for (field, size) in [
            ("keygen.key_size", self.keygen.key_size),
            ("keygen.auth_key_size", self.keygen.auth_key_size),
        ] {
            if !(1024..=4096).contains(&size) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("RSA key size {} is outside 1024..=4096", size),
                });
            }
        }

        if self.card.user_pin_length < 6 || self.card.user_pin_length > 127 {
            return Err(ConfigError::Invalid {
                field: "card.user_pin_length",
                reason: "User PIN length must be between 6 and 127".to_string(),
            });
        }

        if self.card.admin_pin_length < 8 || self.card.admin_pin_length > 127 {
            return Err(ConfigError::Invalid {
                field: "card.admin_pin_length",
                reason: "Admin PIN length must be between 8 and 127".to_string(),
            });
        }

        for (field, pin, role) in [
            ("card.default_user_pin", self.card.user_pin(), PinRole::User),
            ("card.default_admin_pin", self.card.admin_pin(), PinRole::Admin),
        ] {
            validate_pin(&pin, role).map_err(|e| ConfigError::Invalid {
                field,
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

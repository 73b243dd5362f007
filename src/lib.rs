//! autocard - OpenPGP smart card provisioning by driving gpg
//!
//! This library automates the interactive card setup that gpg otherwise
//! requires a person for: generating an RSA key, adding an authentication
//! subkey, moving all three keys onto the card, and changing the card PINs.
//!
//! gpg is started on a pseudoterminal with `--command-fd=0 --status-fd=2`,
//! so every question it asks arrives as a machine-readable status line and
//! every reply is acknowledged with `GOT_IT`. Banner text that the dialogue
//! depends on (menu entries, usage listings) is checked before any reply
//! that relies on it is sent.
//!
//! ## Module Organization
//!
//! ### Core Functionality
//!
//! - [`pty`] - Peer process on a PTY, scripted replay peer, launchers
//! - [`protocol`] - Status line and banner recognition
//! - [`session`] - Read cursor and `expect` primitives over one peer
//! - [`dialogue`] - Prompt/reply/acknowledge round trips
//! - [`workflow`] - The provisioning workflows as step lists
//! - [`provision`] - Caller-facing operations
//!
//! ### Supporting Modules
//!
//! - [`config`] - Configuration loading and defaults
//! - [`credentials`] - Identity, PIN validation and generation
//! - [`models`] - Secrets, key identifiers, peer process lifecycle
//! - [`security_audit`] - Audit log of provisioning events
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use autocard::{ConfigLoader, Identity, Provisioner};
//!
//! # async fn run() -> autocard::Result<()> {
//! let config = ConfigLoader::load(None)?;
//! let provisioner = Provisioner::with_gpg(config);
//!
//! let identity = Identity::new("Jane Doe", "jane@example.com")?;
//! let key_id = provisioner.provision_new_card(&identity).await?;
//! println!("Key ID: {}", key_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! One peer session at a time, driven from a single async task:
//!
//! - **PTY Reader Thread:** Reads peer output (blocking I/O) into a tokio channel
//! - **PTY Writer Thread:** Writes replies to the peer (blocking I/O)
//! - **Session:** Consumes output strictly in arrival order, each wait bounded
//!   by a deadline

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod credentials;
pub mod error;

// Core modules
pub mod dialogue;
pub mod protocol;
pub mod provision;
pub mod pty;
pub mod session;
pub mod workflow;

// Model modules
pub mod models;

pub mod security_audit;

// Re-exports for core functionality
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use provision::Provisioner;

// Convenience re-exports for common types
pub use config::loader::ConfigLoader;
pub use credentials::{Identity, PinSource, RandomPinSource};
pub use models::{KeyId, Secret};

// Version information
/// The current version of autocard from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

//! Peer Launching
//!
//! Builds the command line for one peer operation and starts it. The
//! [`PeerLauncher`] trait is the seam between the provisioner and the real
//! peer; tests substitute [`super::replay::ReplayLauncher`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::channel::PeerChannel;
use super::process::spawn_pty_process;
use crate::config::PeerConfig;
use crate::error::Result;

/// Options that put the peer into status-protocol mode
pub const PROTOCOL_ARGS: [&str; 4] = [
    "--command-fd=0",
    "--status-fd=2",
    "--pinentry-mode",
    "loopback",
];

/// Complete command line for one peer operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Index in `args` where the operation's own arguments begin
    operation_start: usize,
}

impl PeerInvocation {
    /// `<program> <protocol args> [--homedir dir] [extra args] <operation args>`
    pub fn new(config: &PeerConfig, operation_args: &[String]) -> Self {
        let mut args: Vec<String> = PROTOCOL_ARGS.iter().map(|s| s.to_string()).collect();
        if let Some(homedir) = &config.homedir {
            args.push("--homedir".to_string());
            args.push(homedir.display().to_string());
        }
        args.extend(config.extra_args.iter().cloned());

        let operation_start = args.len();
        args.extend(operation_args.iter().cloned());

        Self {
            program: config.program.clone(),
            args,
            env: config.environment.clone(),
            operation_start,
        }
    }

    /// Arguments naming the operation, e.g. `["--edit-key", "<id>"]`
    pub fn operation_args(&self) -> &[String] {
        &self.args[self.operation_start..]
    }
}

impl fmt::Display for PeerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Starts peers for workflows
pub trait PeerLauncher: Send + Sync {
    /// Start the peer described by `invocation`
    ///
    /// # Errors
    /// Returns a spawn error if the peer cannot be started
    fn launch(&self, invocation: &PeerInvocation) -> Result<Box<dyn PeerChannel>>;
}

/// Launches the real peer on a PTY
#[derive(Debug, Clone)]
pub struct GpgLauncher {
    exit_report_interval: Duration,
}

impl GpgLauncher {
    pub fn new(exit_report_interval: Duration) -> Self {
        Self {
            exit_report_interval,
        }
    }
}

impl Default for GpgLauncher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl PeerLauncher for GpgLauncher {
    fn launch(&self, invocation: &PeerInvocation) -> Result<Box<dyn PeerChannel>> {
        debug!("Launching {}", invocation);
        let channel = spawn_pty_process(
            &invocation.program,
            &invocation.args,
            &invocation.env,
            self.exit_report_interval,
        )?;
        Ok(Box::new(channel))
    }
}

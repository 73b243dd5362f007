//! Peer Process Model
//!
//! Lifecycle of one spawned peer: when it started, how long it ran and how
//! it exited. Arguments are kept for diagnostics only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the state of a peer process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PeerState {
    /// Process has been created but not started
    #[default]
    Created,
    /// Process is currently running
    Running,
    /// Process has exited
    Exited,
}

/// Lifecycle record of a spawned peer
#[derive(Debug, Clone)]
pub struct PeerProcess {
    /// OS process identifier
    pub pid: Option<u32>,

    /// Current state of the process
    pub state: PeerState,

    /// When the process was started
    pub start_time: Option<DateTime<Utc>>,

    /// When the process exited (if applicable)
    pub end_time: Option<DateTime<Utc>>,

    /// Exit code (if process has exited)
    pub exit_code: Option<u32>,

    /// Program that was executed
    pub command: String,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl PeerProcess {
    /// Create a new peer process in the Created state
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self {
            pid: None,
            state: PeerState::Created,
            start_time: None,
            end_time: None,
            exit_code: None,
            command,
            args,
        }
    }

    /// Mark the process as started with the given PID
    pub fn mark_started(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = PeerState::Running;
        self.start_time = Some(Utc::now());
    }

    /// Mark the process as exited with the given exit code
    pub fn mark_exited(&mut self, exit_code: u32) {
        self.state = PeerState::Exited;
        self.end_time = Some(Utc::now());
        self.exit_code = Some(exit_code);
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PeerState::Running)
    }

    pub fn has_exited(&self) -> bool {
        matches!(self.state, PeerState::Exited)
    }

    /// Get the run duration if the process has exited
    pub fn run_duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                Some(end.signed_duration_since(start).to_std().unwrap_or_default())
            }
            _ => None,
        }
    }

    /// Command line for logs; the key identifier is the only variable part
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

impl std::fmt::Display for PeerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state_str = match self.state {
            PeerState::Created => "Created",
            PeerState::Running => "Running",
            PeerState::Exited => "Exited",
        };
        let pid_str = self.pid.map_or("N/A".to_string(), |pid| pid.to_string());

        write!(f, "{} [{}] - {}", self.command_line(), pid_str, state_str)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit: {})", code)?;
        }
        Ok(())
    }
}

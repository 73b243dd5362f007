//! Workflow Engine
//!
//! Each peer operation is a [`Workflow`]: the arguments the peer is started
//! with and a linear list of [`Step`]s replayed in order against one
//! session. There is no branching and no retry; the first failing step ends
//! the workflow and the error records where it happened.

pub mod keygen;
pub mod keytocard;
pub mod pin;
pub mod subkey;

use std::fmt;
use std::time::Duration;

use crate::dialogue::{exchange, Reply};
use crate::error::{Error, Result};
use crate::models::{KeyId, Secret};
use crate::protocol::Pattern;
use crate::session::Session;

pub use keygen::key_generation;
pub use keytocard::transfer_to_card;
pub use pin::{change_admin_pin, change_user_pin};
pub use subkey::add_auth_subkey;

/// How long a step may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The session's timeout
    Standard,
    /// The key generation timeout; the peer is busy producing key material
    KeyGeneration,
}

/// One step of a workflow
#[derive(Debug, Clone)]
pub enum Step {
    /// Banner that must appear before the next prompt request
    Guard {
        pattern: Pattern,
        description: String,
        wait: Wait,
    },
    /// Banner that must appear within the timeout
    Milestone { pattern: Pattern },
    /// Answer the prompt for `field`
    Exchange { field: String, reply: Reply },
    /// Capture the identifier from `KEY_CREATED`, which must be of `kind`
    CaptureKeyCreated { kind: String },
    /// Output closes, then the peer exits with status 0
    AwaitExit,
}

impl Step {
    pub fn guard(pattern: impl Into<Pattern>, description: impl Into<String>) -> Self {
        Step::Guard {
            pattern: pattern.into(),
            description: description.into(),
            wait: Wait::Standard,
        }
    }

    /// Guard that `text` is shown as a literal banner
    pub fn banner(text: &str) -> Self {
        Self::guard(Pattern::literal(text), text)
    }

    /// Guard that a line ends with exactly `text`
    pub fn line_tail(text: &str) -> Result<Self> {
        Ok(Self::guard(Pattern::line_tail(text)?, text))
    }

    /// Guard that a line starts with `text`
    pub fn line_start(text: &str, description: impl Into<String>) -> Self {
        Self::guard(Pattern::line_start(text), description)
    }

    /// Use the key generation timeout for this step
    pub fn slow(self) -> Self {
        match self {
            Step::Guard {
                pattern,
                description,
                ..
            } => Step::Guard {
                pattern,
                description,
                wait: Wait::KeyGeneration,
            },
            other => other,
        }
    }

    pub fn milestone(text: &str) -> Self {
        Step::Milestone {
            pattern: Pattern::literal(text),
        }
    }

    pub fn exchange(field: &str, value: impl Into<String>) -> Self {
        Step::Exchange {
            field: field.to_string(),
            reply: Reply::Text(value.into()),
        }
    }

    pub fn exchange_secret(field: &str, secret: &Secret) -> Self {
        Step::Exchange {
            field: field.to_string(),
            reply: Reply::Secret(secret.clone()),
        }
    }

    pub fn capture_key_created(kind: &str) -> Self {
        Step::CaptureKeyCreated {
            kind: kind.to_string(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Guard { description, .. } => write!(f, "guard '{}'", description),
            Step::Milestone { pattern } => write!(f, "milestone {}", pattern),
            Step::Exchange { field, reply } => write!(f, "exchange {}={}", field, reply),
            Step::CaptureKeyCreated { kind } => write!(f, "capture KEY_CREATED {}", kind),
            Step::AwaitExit => f.write_str("await exit"),
        }
    }
}

/// What a completed workflow produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// Identifier captured from `KEY_CREATED`, if the workflow captures one
    pub key_id: Option<KeyId>,
    /// The peer's exit status
    pub exit_code: u32,
}

/// A peer operation as an ordered list of steps
#[derive(Debug, Clone)]
pub struct Workflow {
    name: &'static str,
    args: Vec<String>,
    steps: Vec<Step>,
}

impl Workflow {
    pub fn new(name: &'static str, args: Vec<String>, steps: Vec<Step>) -> Self {
        Self { name, args, steps }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Operation arguments the peer is started with
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Fields answered by this workflow with their replies, in order
    pub fn exchanges(&self) -> impl Iterator<Item = (&str, &Reply)> {
        self.steps.iter().filter_map(|step| match step {
            Step::Exchange { field, reply } => Some((field.as_str(), reply)),
            _ => None,
        })
    }

    /// Replay every step against `session`
    ///
    /// # Errors
    /// The first failing step's error, wrapped with the workflow name, step
    /// index and step description
    pub async fn run(&self, session: &mut Session, keygen_timeout: Duration) -> Result<WorkflowOutcome> {
        info!("Starting {} ({} steps)", self.name, self.steps.len());
        let mut outcome = WorkflowOutcome::default();

        for (index, step) in self.steps.iter().enumerate() {
            debug!("{} step {}: {}", self.name, index, step);
            self.run_step(step, session, keygen_timeout, &mut outcome)
                .await
                .map_err(|e| e.at_step(self.name, index, step.to_string()))?;
        }

        info!("Finished {}", self.name);
        Ok(outcome)
    }

    async fn run_step(
        &self,
        step: &Step,
        session: &mut Session,
        keygen_timeout: Duration,
        outcome: &mut WorkflowOutcome,
    ) -> Result<()> {
        match step {
            Step::Guard {
                pattern,
                description,
                wait,
            } => {
                let wait = match wait {
                    Wait::Standard => session.timeout(),
                    Wait::KeyGeneration => keygen_timeout,
                };
                session.expect_guard(pattern, description, wait).await?;
            }
            Step::Milestone { pattern } => {
                session.expect(pattern).await?;
            }
            Step::Exchange { field, reply } => {
                exchange(session, field, reply).await?;
            }
            Step::CaptureKeyCreated { kind } => {
                let (created, key_id) = session.expect_key_created(keygen_timeout).await?;
                if &created != kind {
                    return Err(Error::guard(format!(
                        "expected KEY_CREATED {} but the peer created a key of kind {}",
                        kind, created
                    )));
                }
                info!("Peer created key {}", key_id);
                outcome.key_id = Some(key_id);
            }
            Step::AwaitExit => {
                session.expect_eof().await?;
                let code = session.wait_exit().await?;
                outcome.exit_code = code;
                if code != 0 {
                    return Err(Error::PeerExit { code });
                }
            }
        }
        Ok(())
    }
}

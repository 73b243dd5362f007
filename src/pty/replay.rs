//! Transcript Replay
//!
//! An in-memory peer that plays back a recorded dialogue. A [`Script`] lists
//! the output the peer produces and the points at which it waits for a
//! reply; [`ScriptedPeer`] plays it through the [`PeerChannel`] interface and
//! records every reply it receives. Like a real peer, a script that is
//! waiting for input produces nothing until a reply arrives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::channel::PeerChannel;
use super::launcher::{PeerInvocation, PeerLauncher};
use crate::error::{Error, Result};
use crate::protocol::{PromptKind, StatusParser, StatusToken, DEFAULT_STATUS_PREFIX};

#[derive(Debug, Clone)]
enum Event {
    /// Bytes the peer writes
    Output(String),
    /// The peer blocks until it reads one line
    AwaitReply { field: String, acknowledge: bool },
    /// The peer hangs without producing output or exiting
    Stall,
}

/// A reply received by a scripted peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReply {
    /// The field the peer was waiting on, or `None` for input it did not ask for
    pub field: Option<String>,
    pub value: String,
}

/// Replies shared between a peer and the test observing it
pub type ReplyLog = Arc<Mutex<Vec<RecordedReply>>>;

/// A recorded dialogue for one peer run
#[derive(Debug, Clone)]
pub struct Script {
    events: Vec<Event>,
    exit_code: u32,
    parser: StatusParser,
}

impl Script {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_STATUS_PREFIX)
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            events: Vec::new(),
            exit_code: 0,
            parser: StatusParser::new(prefix),
        }
    }

    /// Raw output, exactly as given
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.events.push(Event::Output(text.into()));
        self
    }

    /// One line of human-readable output
    pub fn line(self, line: &str) -> Self {
        self.text(format!("{}\n", line))
    }

    /// A status line; `body` is everything after the prefix
    pub fn status(self, body: &str) -> Self {
        let line = format!("{}{}\n", self.parser.marker(), body);
        self.text(line)
    }

    /// Ask for `field`, wait for one reply and acknowledge it with `GOT_IT`
    pub fn prompt(self, kind: PromptKind, field: &str) -> Self {
        self.request(kind, field, true)
    }

    /// Ask for `field` and wait for one reply, without acknowledging it
    pub fn prompt_without_ack(self, kind: PromptKind, field: &str) -> Self {
        self.request(kind, field, false)
    }

    /// `GET_LINE` prompt
    pub fn line_prompt(self, field: &str) -> Self {
        self.prompt(PromptKind::Line, field)
    }

    /// `GET_HIDDEN` prompt
    pub fn hidden_prompt(self, field: &str) -> Self {
        self.prompt(PromptKind::Hidden, field)
    }

    /// `GET_BOOL` prompt
    pub fn bool_prompt(self, field: &str) -> Self {
        self.prompt(PromptKind::Bool, field)
    }

    /// `KEY_CREATED <kind> <identifier>`
    pub fn key_created(self, kind: &str, identifier: &str) -> Self {
        let token = StatusToken::KeyCreated {
            kind: kind.to_string(),
            identifier: identifier.to_string(),
        };
        let line = self.parser.render(&token);
        self.text(line)
    }

    /// Hang here: no more output and no exit
    pub fn stall(mut self) -> Self {
        self.events.push(Event::Stall);
        self
    }

    /// Exit status reported once the script has played out
    pub fn exit_code(mut self, code: u32) -> Self {
        self.exit_code = code;
        self
    }

    fn request(mut self, kind: PromptKind, field: &str, acknowledge: bool) -> Self {
        let token = StatusToken::Prompt {
            kind,
            field: field.to_string(),
        };
        let line = self.parser.render(&token);
        self.events.push(Event::Output(line));
        self.events.push(Event::AwaitReply {
            field: field.to_string(),
            acknowledge,
        });
        self
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

/// A peer that plays a [`Script`]
pub struct ScriptedPeer {
    label: String,
    events: VecDeque<Event>,
    waiting_on: Option<(String, bool)>,
    exit_code: u32,
    finished: bool,
    ack: String,
    replies: ReplyLog,
}

impl ScriptedPeer {
    pub fn new(script: Script) -> Self {
        Self::with_log(script, "scripted peer", ReplyLog::default())
    }

    fn with_log(script: Script, label: &str, replies: ReplyLog) -> Self {
        let ack = script.parser.render(&StatusToken::Ack);
        Self {
            label: label.to_string(),
            events: script.events.into(),
            waiting_on: None,
            exit_code: script.exit_code,
            finished: false,
            ack,
            replies,
        }
    }

    /// Replies received so far
    pub fn replies(&self) -> ReplyLog {
        Arc::clone(&self.replies)
    }

    fn record(&self, field: Option<String>, value: String) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(RecordedReply { field, value });
        }
    }
}

#[async_trait]
impl PeerChannel for ScriptedPeer {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::ChannelWrite {
                reason: format!("{} already exited with status {}", self.label, self.exit_code),
            });
        }

        // The peer may not have reached its read yet
        if self.waiting_on.is_none() {
            if let Some(Event::AwaitReply { field, acknowledge }) = self.events.front() {
                self.waiting_on = Some((field.clone(), *acknowledge));
                self.events.pop_front();
            }
        }

        let text = String::from_utf8_lossy(data);
        for value in text.lines() {
            match self.waiting_on.take() {
                Some((field, acknowledge)) => {
                    self.record(Some(field), value.to_string());
                    if acknowledge {
                        self.events.push_front(Event::Output(self.ack.clone()));
                    }
                }
                None => self.record(None, value.to_string()),
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.waiting_on.is_some() {
                std::future::pending::<()>().await;
            }
            match self.events.pop_front() {
                Some(Event::Output(text)) => return Ok(Some(text.into_bytes())),
                Some(Event::AwaitReply { field, acknowledge }) => {
                    self.waiting_on = Some((field, acknowledge));
                }
                Some(Event::Stall) => {
                    self.events.push_front(Event::Stall);
                    std::future::pending::<()>().await;
                }
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn wait_exit(&mut self) -> Result<u32> {
        if self.waiting_on.is_some() || matches!(self.events.front(), Some(Event::Stall)) {
            std::future::pending::<()>().await;
        }
        self.finished = true;
        Ok(self.exit_code)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Hands out scripted peers in order, one per launch
#[derive(Default)]
pub struct ReplayLauncher {
    scripts: Mutex<VecDeque<Script>>,
    invocations: Arc<Mutex<Vec<PeerInvocation>>>,
    replies: ReplyLog,
}

impl ReplayLauncher {
    pub fn new<I>(scripts: I) -> Self
    where
        I: IntoIterator<Item = Script>,
    {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            invocations: Arc::default(),
            replies: ReplyLog::default(),
        }
    }

    /// Every reply received by every peer launched so far, in order
    pub fn replies(&self) -> Vec<RecordedReply> {
        self.replies
            .lock()
            .map(|replies| replies.clone())
            .unwrap_or_default()
    }

    /// Every invocation launched so far, in order
    pub fn invocations(&self) -> Vec<PeerInvocation> {
        self.invocations
            .lock()
            .map(|invocations| invocations.clone())
            .unwrap_or_default()
    }

    /// Scripts not yet launched
    pub fn remaining(&self) -> usize {
        self.scripts.lock().map(|scripts| scripts.len()).unwrap_or(0)
    }
}

impl PeerLauncher for ReplayLauncher {
    fn launch(&self, invocation: &PeerInvocation) -> Result<Box<dyn PeerChannel>> {
        let script = self
            .scripts
            .lock()
            .map_err(|e| Error::Other(format!("replay launcher poisoned: {}", e)))?
            .pop_front()
            .ok_or_else(|| Error::PeerSpawnFailed {
                command: invocation.to_string(),
                reason: "no scripted peer left to replay".to_string(),
            })?;

        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(invocation.clone());
        }

        let label = format!("replay of {}", invocation.operation_args().join(" "));
        Ok(Box::new(ScriptedPeer::with_log(
            script,
            &label,
            Arc::clone(&self.replies),
        )))
    }
}

//! Peer Sessions
//!
//! A [`Session`] is one live peer plus a read cursor over its output. Every
//! `expect` primitive searches forward from the cursor and consumes what it
//! matched together with everything before it, so matching is strictly in
//! arrival order and never looks back.

pub mod transcript;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::models::{KeyId, Secret};
use crate::protocol::{Pattern, PromptKind, StatusParser, StatusToken, DEFAULT_STATUS_PREFIX};
use crate::pty::PeerChannel;

pub use transcript::{EntryKind, Transcript, TranscriptEntry};

/// Settings for a new session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// What the session is for, used in logs and transcript names
    pub label: String,
    /// Default deadline for each expect
    pub timeout: Duration,
    /// Status line prefix, without brackets
    pub status_prefix: String,
    /// Mirror peer output to stderr
    pub mirror: bool,
}

impl SessionOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            label: "session".to_string(),
            timeout: Duration::from_secs(60),
            status_prefix: DEFAULT_STATUS_PREFIX.to_string(),
            mirror: false,
        }
    }
}

/// Outcome of scanning the unconsumed output once
enum Scan<T> {
    /// Found; consume through the given byte offset
    Found(usize, T),
    /// Not there yet
    Pending,
}

/// One live peer
pub struct Session {
    id: Uuid,
    label: String,
    channel: Box<dyn PeerChannel>,
    /// Output received but not yet consumed
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    undecoded: Vec<u8>,
    /// Whether `buffer` begins at the start of a line
    at_line_start: bool,
    eof: bool,
    timeout: Duration,
    parser: StatusParser,
    transcript: Transcript,
}

impl Session {
    pub fn new(channel: Box<dyn PeerChannel>, options: SessionOptions) -> Self {
        let id = Uuid::new_v4();
        debug!(
            "Session {} ({}) attached to {}",
            id,
            options.label,
            channel.describe()
        );
        Self {
            id,
            label: options.label,
            channel,
            buffer: String::new(),
            undecoded: Vec::new(),
            at_line_start: true,
            eof: false,
            timeout: options.timeout,
            parser: StatusParser::new(&options.status_prefix),
            transcript: Transcript::new(options.mirror),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether the peer has closed its output
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Output received but not yet consumed
    pub fn unconsumed(&self) -> &str {
        &self.buffer
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Write this session's transcript to an owner-only file in `directory`
    pub fn save_transcript(&self, directory: &Path) -> Result<PathBuf> {
        let slug: String = self
            .label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        self.transcript
            .save(directory, &format!("autocard-{}-{}", slug, self.id))
    }

    /// Send one line
    ///
    /// # Errors
    /// `InvalidReply` if `text` contains a line break; nothing is written
    pub async fn send(&mut self, text: &str) -> Result<()> {
        ensure_single_line(text)?;
        debug!("[{}] > {}", self.label, text);
        self.transcript.record_sent(text);
        self.channel.write(format!("{}\n", text).as_bytes()).await
    }

    /// Send one line whose content must never be logged
    ///
    /// # Errors
    /// `InvalidReply` if the secret contains a line break; nothing is written
    pub async fn send_secret(&mut self, secret: &Secret) -> Result<()> {
        ensure_single_line(secret.expose())?;
        debug!("[{}] > {}", self.label, secret);
        self.transcript.record_secret(secret);
        let mut line = Zeroizing::new(Vec::with_capacity(secret.len() + 1));
        line.extend_from_slice(secret.expose().as_bytes());
        line.push(b'\n');
        self.channel.write(&line).await
    }

    /// Wait for `pattern` and return the matched text
    pub async fn expect(&mut self, pattern: &Pattern) -> Result<String> {
        self.expect_within(pattern, self.timeout).await
    }

    /// [`Session::expect`] with an explicit deadline
    pub async fn expect_within(&mut self, pattern: &Pattern, wait: Duration) -> Result<String> {
        self.wait_for(&pattern.to_string(), wait, |buffer, at_line_start, _| {
            Ok(match pattern.find_at(buffer, at_line_start) {
                Some(found) => Scan::Found(found.end, buffer[found].to_string()),
                None => Scan::Pending,
            })
        })
        .await
    }

    /// Wait for `pattern`, which must appear before the next prompt request
    pub async fn expect_guard(
        &mut self,
        pattern: &Pattern,
        description: &str,
        wait: Duration,
    ) -> Result<String> {
        self.wait_for(&pattern.to_string(), wait, |buffer, at_line_start, parser| {
            let found = pattern.find_at(buffer, at_line_start);
            if let Some(prompt) = parser.first_prompt(buffer) {
                let before_banner = found
                    .as_ref()
                    .map_or(true, |found| prompt.span.start < found.start);
                if before_banner {
                    return Err(Error::guard(format!(
                        "{} was not shown before {}",
                        description, prompt.token
                    )));
                }
            }
            Ok(match found {
                Some(found) => Scan::Found(found.end, buffer[found].to_string()),
                None => Scan::Pending,
            })
        })
        .await
    }

    /// Wait for the next prompt request, which must be for `field`
    pub async fn expect_prompt(&mut self, field: &str) -> Result<PromptKind> {
        let waiting_for = format!("prompt '{}'", field);
        let wait = self.timeout;
        self.wait_for(&waiting_for, wait, |buffer, _, parser| {
            for located in parser.scan(buffer) {
                if let StatusToken::Prompt { kind, field: asked } = &located.token {
                    if asked == field {
                        return Ok(Scan::Found(located.span.end, *kind));
                    }
                    return Err(Error::guard(format!(
                        "expected prompt '{}' but peer asked for '{}'",
                        field, asked
                    )));
                }
            }
            Ok(Scan::Pending)
        })
        .await
    }

    /// Wait for the acknowledgement of the last reply
    pub async fn expect_ack(&mut self) -> Result<()> {
        let wait = self.timeout;
        self.wait_for("GOT_IT", wait, |buffer, _, parser| {
            for located in parser.scan(buffer) {
                match &located.token {
                    StatusToken::Ack => return Ok(Scan::Found(located.span.end, ())),
                    StatusToken::Prompt { field, .. } => {
                        return Err(Error::guard(format!(
                            "peer asked for '{}' without acknowledging the reply",
                            field
                        )));
                    }
                    _ => {}
                }
            }
            Ok(Scan::Pending)
        })
        .await
    }

    /// Wait for `KEY_CREATED` and return its kind and identifier
    pub async fn expect_key_created(&mut self, wait: Duration) -> Result<(String, KeyId)> {
        self.wait_for("KEY_CREATED", wait, |buffer, _, parser| {
            for located in parser.scan(buffer) {
                match located.token {
                    StatusToken::KeyCreated { kind, identifier } => {
                        return Ok(Scan::Found(located.span.end, (kind, KeyId::new(identifier))));
                    }
                    StatusToken::Prompt { field, .. } => {
                        return Err(Error::guard(format!(
                            "peer asked for '{}' instead of creating the key",
                            field
                        )));
                    }
                    _ => {}
                }
            }
            Ok(Scan::Pending)
        })
        .await
    }

    /// Consume output until the peer closes it
    pub async fn expect_eof(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(prompt) = self.parser.first_prompt(&self.buffer) {
                return Err(Error::guard(format!(
                    "peer asked for '{}' after the dialogue finished",
                    prompt.token
                )));
            }
            if self.eof {
                let rest = self.buffer.len();
                self.consume(rest);
                return Ok(());
            }
            self.fill(deadline, self.timeout, "end of output").await?;
        }
    }

    /// Collect whatever the peer prints after a failed step
    ///
    /// Reads until end of output or the session timeout, whichever comes
    /// first, so the peer's own error and cleanup output reaches the
    /// transcript. Nothing is sent and the peer is left running.
    pub async fn drain_after_abort(&mut self) {
        let deadline = Instant::now() + self.timeout;
        while !self.eof {
            match self.fill(deadline, self.timeout, "end of output").await {
                Ok(()) => {}
                Err(e) => {
                    debug!("[{}] stopped collecting output: {}", self.label, e);
                    break;
                }
            }
        }
        self.transcript.flush();
    }

    /// Wait for the peer to terminate and return its exit code
    pub async fn wait_exit(&mut self) -> Result<u32> {
        let code = self.channel.wait_exit().await?;
        self.transcript.record_exit(code);
        debug!("[{}] peer exited with status {}", self.label, code);
        Ok(code)
    }

    /// Scan, read more, and scan again until `scan` finds something
    async fn wait_for<T, F>(&mut self, waiting_for: &str, wait: Duration, mut scan: F) -> Result<T>
    where
        F: FnMut(&str, bool, &StatusParser) -> Result<Scan<T>>,
    {
        let deadline = Instant::now() + wait;
        loop {
            if let Scan::Found(end, value) = scan(&self.buffer, self.at_line_start, &self.parser)? {
                self.consume(end);
                return Ok(value);
            }
            if self.eof {
                return Err(Error::EndOfStream {
                    waiting_for: waiting_for.to_string(),
                });
            }
            self.fill(deadline, wait, waiting_for).await?;
        }
    }

    /// Read one more chunk into the buffer, or note end of stream
    async fn fill(&mut self, deadline: Instant, wait: Duration, waiting_for: &str) -> Result<()> {
        let chunk = tokio::time::timeout_at(deadline, self.channel.read())
            .await
            .map_err(|_| Error::Timeout {
                waiting_for: waiting_for.to_string(),
                duration: wait,
            })??;

        match chunk {
            Some(bytes) => {
                let text = decode_chunk(&mut self.undecoded, &bytes);
                self.transcript.record_output(&text);
                self.buffer.push_str(&text);
            }
            None => {
                if !self.undecoded.is_empty() {
                    let tail = String::from_utf8_lossy(&self.undecoded).into_owned();
                    self.undecoded.clear();
                    self.transcript.record_output(&tail);
                    self.buffer.push_str(&tail);
                }
                self.transcript.record_end_of_stream();
                self.eof = true;
            }
        }
        Ok(())
    }

    fn consume(&mut self, end: usize) {
        if end == 0 {
            return;
        }
        self.at_line_start = self.buffer[..end].ends_with('\n');
        self.buffer.drain(..end);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("peer", &self.channel.describe())
            .field("eof", &self.eof)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A reply is answered by exactly one line on the command descriptor; an
/// embedded line break would answer whatever the peer asks next
fn ensure_single_line(text: &str) -> Result<()> {
    if text.contains(['\n', '\r']) {
        return Err(Error::InvalidReply {
            reason: "reply contains a line break".to_string(),
        });
    }
    Ok(())
}

/// Append `chunk` to `pending` and decode as much as is complete
///
/// A multi-byte character split across chunks stays in `pending` until its
/// remaining bytes arrive. Invalid bytes decode as U+FFFD.
fn decode_chunk(pending: &mut Vec<u8>, chunk: &[u8]) -> String {
    pending.extend_from_slice(chunk);

    let mut out = String::new();
    let mut start = 0;
    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(text) => {
                out.push_str(text);
                start = pending.len();
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[start..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }
    pending.drain(..start);
    out
}

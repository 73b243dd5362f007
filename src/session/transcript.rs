//! Session Transcript
//!
//! A timestamped record of everything a peer printed and everything sent to
//! it. Secret replies are recorded as a mask, and any echo of a secret in the
//! peer's output is masked too: the PTY echoes input back as output.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Secret;

/// What a secret looks like in a rendered transcript
pub const MASK: &str = "********";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A line (or trailing fragment) printed by the peer
    Output(String),
    /// A plain reply
    Sent(String),
    /// A secret reply; the value is never kept
    SentSecret,
    /// The peer closed its output
    EndOfStream,
    /// The peer exited
    Exit(u32),
}

#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub at: DateTime<Utc>,
    pub kind: EntryKind,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.at.format("%H:%M:%S%.3f");
        match &self.kind {
            EntryKind::Output(text) => write!(f, "{} < {}", at, text.trim_end_matches(['\r', '\n'])),
            EntryKind::Sent(text) => write!(f, "{} > {}", at, text),
            EntryKind::SentSecret => write!(f, "{} > {}", at, MASK),
            EntryKind::EndOfStream => write!(f, "{} - end of output", at),
            EntryKind::Exit(code) => write!(f, "{} - exited with status {}", at, code),
        }
    }
}

/// Ordered record of one session
#[derive(Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    /// Output received since the last complete line
    partial: String,
    /// Values masked wherever they appear in output
    secrets: Vec<Secret>,
    /// Copy completed output lines to stderr
    mirror: bool,
}

impl Transcript {
    pub fn new(mirror: bool) -> Self {
        Self {
            mirror,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Record output; complete lines become entries
    pub fn record_output(&mut self, text: &str) {
        self.partial.push_str(text);
        while let Some(newline) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=newline).collect();
            self.push_output(line);
        }
    }

    /// Record a plain reply
    pub fn record_sent(&mut self, text: &str) {
        self.flush();
        self.push(EntryKind::Sent(text.to_string()));
    }

    /// Record that a secret was sent and mask its echo from now on
    pub fn record_secret(&mut self, secret: &Secret) {
        self.flush();
        if !secret.is_empty() && !self.secrets.contains(secret) {
            self.secrets.push(secret.clone());
        }
        self.push(EntryKind::SentSecret);
    }

    pub fn record_end_of_stream(&mut self) {
        self.flush();
        self.push(EntryKind::EndOfStream);
    }

    pub fn record_exit(&mut self, code: u32) {
        self.flush();
        self.push(EntryKind::Exit(code));
    }

    /// Turn any incomplete output line into an entry
    pub fn flush(&mut self) {
        if !self.partial.is_empty() {
            let fragment = std::mem::take(&mut self.partial);
            self.push_output(fragment);
        }
    }

    /// Render all entries, one per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        if !self.partial.is_empty() {
            out.push_str(&self.mask(&self.partial));
            out.push('\n');
        }
        out
    }

    /// Write the rendered transcript to a new owner-only file in `directory`
    pub fn save(&self, directory: &Path, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(format!("{}.log", name));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        file.write_all(self.render().as_bytes())?;
        Ok(path)
    }

    fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for secret in &self.secrets {
            masked = masked.replace(secret.expose(), MASK);
        }
        masked
    }

    fn push_output(&mut self, text: String) {
        let masked = self.mask(&text);
        trace!("peer: {}", masked.trim_end());
        if self.mirror {
            let _ = std::io::stderr().write_all(masked.as_bytes());
        }
        self.push(EntryKind::Output(masked));
    }

    fn push(&mut self, kind: EntryKind) {
        self.entries.push(TranscriptEntry {
            at: Utc::now(),
            kind,
        });
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("entries", &self.entries.len())
            .field("mirror", &self.mirror)
            .finish()
    }
}

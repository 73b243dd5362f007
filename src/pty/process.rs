//! PTY Process Spawning
//!
//! Starts the peer inside a pseudoterminal using portable-pty and exposes it
//! as a [`PeerChannel`]. Blocking PTY I/O is bridged to async code by a
//! reader thread and a writer thread.

use async_trait::async_trait;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtyPair, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::mpsc::channel;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::unbounded_channel;

use super::channel::PeerChannel;
use super::streams::PtyStreams;
use crate::error::{Error, Result};
use crate::models::PeerProcess;

/// How often `wait_exit` polls the child
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wide enough that gpg never wraps a status line
const PEER_PTY_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 200,
    pixel_width: 0,
    pixel_height: 0,
};

/// A peer running on a PTY
pub struct PtyChannel {
    process: PeerProcess,
    streams: PtyStreams,
    child: Box<dyn Child + Send + Sync>,
    // Keeps the master side open for the lifetime of the channel
    _master: Box<dyn MasterPty + Send>,
    exit_report_interval: Duration,
}

impl PtyChannel {
    /// Process bookkeeping for this peer
    pub fn process(&self) -> &PeerProcess {
        &self.process
    }

    /// Record and return the exit code if the child has terminated
    fn poll_exit(&mut self) -> Result<Option<u32>> {
        if let Some(code) = self.process.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => {
                let code = status.exit_code();
                self.process.mark_exited(code);
                debug!(
                    "{} exited with status {} after {:?}",
                    self.process.command_line(),
                    code,
                    self.process.run_duration().unwrap_or_default()
                );
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PeerChannel for PtyChannel {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(code) = self.poll_exit()? {
            return Err(Error::ChannelWrite {
                reason: format!("peer already exited with status {}", code),
            });
        }
        self.streams.write(data)
    }

    async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.streams.read().await)
    }

    async fn wait_exit(&mut self) -> Result<u32> {
        let mut last_report = Instant::now();
        loop {
            if let Some(code) = self.poll_exit()? {
                return Ok(code);
            }
            if last_report.elapsed() >= self.exit_report_interval {
                info!("Still waiting for {} to exit", self.process.command_line());
                last_report = Instant::now();
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    fn describe(&self) -> String {
        self.process.to_string()
    }
}

/// Spawn `command` on a new PTY
pub fn spawn_pty_process(
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
    exit_report_interval: Duration,
) -> Result<PtyChannel> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(PEER_PTY_SIZE)
        .map_err(|e| Error::PtyCreationFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let mut cmd_builder = CommandBuilder::new(command);
    cmd_builder.args(args);
    for (key, value) in env {
        cmd_builder.env(key, value);
    }

    let mut process = PeerProcess::new(command.to_string(), args.to_vec());

    let child = pair
        .slave
        .spawn_command(cmd_builder)
        .map_err(|e| Error::PeerSpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
    process.mark_started(child.process_id());
    info!("Spawned {}", process);

    let (streams, master) = create_pty_streams(pair)?;

    Ok(PtyChannel {
        process,
        streams,
        child,
        _master: master,
        exit_report_interval,
    })
}

/// Linux reports a hung-up PTY as EIO rather than a zero-length read
fn is_hangup(e: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(nix::errno::Errno::EIO as i32)
    }
    #[cfg(not(unix))]
    {
        e.kind() == std::io::ErrorKind::BrokenPipe
    }
}

/// Wire the master side of `pair` to reader and writer threads
fn create_pty_streams(pair: PtyPair) -> Result<(PtyStreams, Box<dyn MasterPty + Send>)> {
    let PtyPair { master, slave } = pair;
    // Only the child holds the slave; otherwise the reader never sees a hangup
    drop(slave);

    let mut master_reader = master
        .try_clone_reader()
        .map_err(|e| Error::PtyReaderCloneFailed {
            reason: e.to_string(),
        })?;
    let mut master_writer = master
        .take_writer()
        .map_err(|e| Error::PtyWriterTakeFailed {
            reason: e.to_string(),
        })?;

    // Channel: PTY output -> async consumer
    let (tx_async_out, rx_async_out) = unbounded_channel::<Vec<u8>>();
    // Channel: replies -> PTY writer thread
    let (tx_input, rx_input) = channel::<Vec<u8>>();

    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match master_reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY read EOF - peer terminated");
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    if tx_async_out.send(buf[..n].to_vec()).is_err() {
                        debug!("PTY read: receiver dropped, stopping reader thread");
                        break;
                    }
                }
                Err(e) if is_hangup(&e) => {
                    debug!("PTY hung up - peer terminated");
                    break;
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::Interrupted {
                        continue;
                    }
                    if e.kind() == std::io::ErrorKind::WouldBlock {
                        thread::sleep(Duration::from_millis(10));
                        continue;
                    }

                    consecutive_errors += 1;
                    warn!(
                        "PTY read error ({}): {} (attempt {}/{})",
                        e.kind(),
                        e,
                        consecutive_errors,
                        MAX_CONSECUTIVE_ERRORS
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("PTY read: too many consecutive errors, stopping reader thread");
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }
        debug!("PTY reader thread exiting");
    });

    thread::spawn(move || {
        while let Ok(data) = rx_input.recv() {
            let mut attempts = 0;
            const MAX_ATTEMPTS: u32 = 3;

            loop {
                match master_writer.write_all(&data) {
                    Ok(()) => {
                        if let Err(e) = master_writer.flush() {
                            debug!("PTY flush error: {}", e);
                        }
                        break;
                    }
                    Err(e) => {
                        attempts += 1;
                        if e.kind() == std::io::ErrorKind::Interrupted {
                            continue;
                        }
                        if e.kind() == std::io::ErrorKind::WouldBlock && attempts < MAX_ATTEMPTS {
                            thread::sleep(Duration::from_millis(10));
                            continue;
                        }
                        // A lost reply would desynchronise the dialogue
                        error!("PTY write error ({}): {}, stopping writer thread", e.kind(), e);
                        return;
                    }
                }
            }
        }
        debug!("PTY writer thread exiting");
    });

    Ok((PtyStreams::from_channels(rx_async_out, tx_input), master))
}

//! PTY Streams
//!
//! Bridges the blocking PTY master to async code: output arrives on a tokio
//! channel fed by a reader thread, input leaves through a std channel drained
//! by a writer thread.

use crate::error::{Error, Result};
use std::sync::mpsc::Sender as StdSender;
use tokio::sync::mpsc::UnboundedReceiver;

/// PTY I/O streams wrapper
pub struct PtyStreams {
    /// Receiver for output bytes from the PTY
    output_rx: UnboundedReceiver<Vec<u8>>,
    /// Sender for input bytes to the PTY
    input_tx: StdSender<Vec<u8>>,
}

impl PtyStreams {
    /// Create new PTY streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<Vec<u8>>,
        input_tx: StdSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
        }
    }

    /// Queue data for the PTY writer thread
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.input_tx
            .send(data.to_vec())
            .map_err(|e| Error::ChannelWrite {
                reason: format!("PTY writer stopped: {}", e),
            })
    }

    /// Next output chunk; `None` once the reader thread has finished
    pub async fn read(&mut self) -> Option<Vec<u8>> {
        self.output_rx.recv().await
    }
}

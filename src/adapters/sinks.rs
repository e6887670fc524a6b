//! Subscriber sink adapters.
//!
//! | Sink           | Carries frames to                         |
//! |----------------|-------------------------------------------|
//! | `WriterSink`   | any `io::Write` (stdout, file, socket)    |
//! | `ChannelSink`  | a bounded tokio mpsc channel              |

use std::io::Write;

use tokio::sync::mpsc;

use crate::app::ports::Subscriber;
use crate::error::DeliveryError;

/// How frames are delimited on a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One frame per line (JSON).
    Lines,
    /// `u32` little-endian length prefix (binary encodings).
    LengthPrefixed,
}

/// Writes each frame to `W`, flushing after every frame.
pub struct WriterSink<W> {
    writer: W,
    framing: Framing,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, framing: Framing) -> Self {
        Self { writer, framing }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Subscriber for WriterSink<W> {
    fn deliver(&mut self, frame: &[u8]) -> Result<(), DeliveryError> {
        match self.framing {
            Framing::Lines => {
                self.writer.write_all(frame)?;
                self.writer.write_all(b"\n")?;
            }
            Framing::LengthPrefixed => {
                let len = u32::try_from(frame.len())
                    .map_err(|_| DeliveryError::Write(std::io::ErrorKind::InvalidInput.into()))?;
                self.writer.write_all(&len.to_le_bytes())?;
                self.writer.write_all(frame)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Hands frames to an async consumer without ever blocking the engine.
///
/// A full channel counts as a failed delivery.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Sink plus the receiving end, with room for `capacity` frames.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSink {
    fn deliver(&mut self, frame: &[u8]) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_vec()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Backlogged,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

use std::{
    collections::VecDeque,
    io::{self, Read},
    time::Duration,
};

use ride_tracker_lib::position_stream::PositionStream;
use serialport::SerialPort;
use thiserror::Error;

/// Longest line kept while waiting for its terminator. Receivers emit at most
/// 82 characters per sentence, so anything longer is noise.
pub const MAX_LINE_LENGTH: usize = 256;

const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Splits a byte stream into `\n` terminated lines.
///
/// Data layout is as follows:
///
/// lines: [complete, complete, ...]   partial: xxxxx
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
    lines: VecDeque<Vec<u8>>,
    overflows: u64,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes, completing lines as terminators arrive.
    ///
    /// Returns how many overlong partial lines this call dropped.
    pub fn push(&mut self, bytes: &[u8]) -> u64 {
        let before = self.overflows;
        for &byte in bytes {
            self.partial.push(byte);

            if byte == b'\n' {
                self.lines.push_back(std::mem::take(&mut self.partial));
            } else if self.partial.len() > MAX_LINE_LENGTH {
                self.partial.clear();
                self.overflows += 1;
            }
        }
        self.overflows - before
    }

    /// Pops the oldest complete line.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.lines.pop_front()
    }

    /// Returns true if a complete line is waiting.
    pub fn has_line(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Number of partial lines dropped for running past [`MAX_LINE_LENGTH`].
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

#[derive(Debug, Error)]
pub enum SerialStreamError {
    #[error("serial port error: {0}")]
    Port(#[from] serialport::Error),
    #[error("serial read failed: {0}")]
    Io(#[from] io::Error),
}

/// Positioning receiver on a serial port.
pub struct SerialPositionStream {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
}

impl SerialPositionStream {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialStreamError> {
        let port = serialport::new(path, baud_rate).timeout(READ_TIMEOUT).open()?;
        tracing::info!("Opened {} at {} baud", path, baud_rate);
        Ok(Self::new(port))
    }

    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            framer: LineFramer::new(),
        }
    }

    fn drain_port(&mut self) -> Result<(), SerialStreamError> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(());
        }

        let mut buffer = vec![0u8; waiting];
        let read = match self.port.read(&mut buffer) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => 0,
            Err(err) => return Err(err.into()),
        };
        let dropped = self.framer.push(&buffer[..read]);
        if dropped > 0 {
            tracing::debug!(
                "Dropped {} overlong line(s), {} in total",
                dropped,
                self.framer.overflows()
            );
        }
        Ok(())
    }
}

impl PositionStream for SerialPositionStream {
    type Error = SerialStreamError;

    fn available(&mut self) -> Result<bool, Self::Error> {
        if !self.framer.has_line() {
            self.drain_port()?;
        }
        Ok(self.framer.has_line())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.framer.pop())
    }
}

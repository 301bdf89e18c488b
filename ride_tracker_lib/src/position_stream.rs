use core::fmt::{Debug, Display};

use crate::{
    gps_fix::GpsFix,
    nmea::{parse_sentence, ParseError, SentenceKind},
};

/// Line-oriented source of positioning sentences, e.g. a UART.
///
/// Both calls must return promptly; `available` is checked before every read
/// so the polling loop never waits on the receiver.
pub trait PositionStream {
    type Error: Debug + Display;

    fn available(&mut self) -> Result<bool, Self::Error>;

    /// Reads one line of raw bytes, without the line terminator guarantee.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// Decodes a raw line as ASCII, dropping every byte outside the ASCII range.
pub fn decode_ascii_lossy(bytes: &[u8]) -> String {
    let line: String = bytes.iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect();
    line.trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing to read this cycle.
    NoData,
    Updated(SentenceKind),
    Discarded(ParseError),
}

/// Feeds at most one sentence per poll into a [`GpsFix`].
#[derive(Debug, Default, Clone)]
pub struct GpsReader {
    parsed: u64,
    discarded: u64,
}

impl GpsReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll<S: PositionStream>(
        &mut self,
        stream: &mut S,
        fix: &mut GpsFix,
    ) -> Result<PollOutcome, S::Error> {
        if !stream.available()? {
            return Ok(PollOutcome::NoData);
        }

        let Some(bytes) = stream.read_line()? else {
            return Ok(PollOutcome::NoData);
        };

        let sentence = decode_ascii_lossy(&bytes);
        match parse_sentence(&sentence, fix) {
            Ok(kind) => {
                self.parsed += 1;
                Ok(PollOutcome::Updated(kind))
            },
            Err(err) => {
                self.discarded += 1;
                tracing::trace!("Discarded sentence {:?}: {}", sentence, err);
                Ok(PollOutcome::Discarded(err))
            },
        }
    }

    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

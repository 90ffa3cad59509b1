//! GNSS receivers stream NMEA 0183 sentences on their own; collecting them is
//! a read-only line loop with a light validity check per sentence.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::port::LineTransport;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NmeaError {
    #[error("sentence does not start with '$'")]
    MissingStart,
    #[error("malformed checksum {0:?}")]
    MalformedChecksum(String),
    #[error("checksum {actual:02X} != {expected:02X}")]
    BadChecksum { expected: u8, actual: u8 },
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Accept `$...` with an optional `*hh` trailer that must match.
pub fn check_sentence(line: &str) -> Result<(), NmeaError> {
    let body = line.strip_prefix('$').ok_or(NmeaError::MissingStart)?;
    let Some((data, sum)) = body.rsplit_once('*') else {
        return Ok(());
    };
    if sum.len() != 2 {
        return Err(NmeaError::MalformedChecksum(sum.to_string()));
    }
    let expected = u8::from_str_radix(sum, 16)
        .map_err(|_| NmeaError::MalformedChecksum(sum.to_string()))?;
    let actual = checksum(data);
    if actual != expected {
        return Err(NmeaError::BadChecksum { expected, actual });
    }
    Ok(())
}

/// Copy valid sentences from `src` to `out`, one per line, until the stream
/// ends or fails. Returns how many sentences were written.
pub fn collect<P: Read>(src: &mut LineTransport<P>, out: &mut dyn Write) -> Result<usize> {
    let mut written = 0usize;
    let mut rejected = 0usize;
    loop {
        let line = match src.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(port = src.name(), "nmea stream ended");
                break;
            }
            Err(err) => {
                warn!(port = src.name(), %err, "nmea stream stopped");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match check_sentence(line) {
            Ok(()) => {
                writeln!(out, "{line}").context("write nmea output")?;
                written += 1;
            }
            Err(err) => {
                rejected += 1;
                warn!(port = src.name(), %err, line, "nmea sentence skipped");
            }
        }
    }
    out.flush().context("flush nmea output")?;
    info!(port = src.name(), written, rejected, "nmea collection done");
    Ok(written)
}

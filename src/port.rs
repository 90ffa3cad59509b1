use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::proto::request::BATCH_DELIMITER;

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Reply timeout in milliseconds
    #[arg(long, default_value_t = 15_000)]
    pub timeout_ms: u64,
    /// Enable RTS/CTS
    #[arg(long, default_value_t = false)]
    pub rtscts: bool,
}

/// Carries request lines to an instrument and returns its reply lines.
pub trait Transport {
    /// Send one request line, return the matching reply without terminator.
    fn send(&mut self, line: &str) -> Result<String>;

    /// Send a `|`-joined batch one request at a time and join the replies
    /// the same way, keeping their order. An empty batch sends nothing.
    fn send_batch(&mut self, batch: &str) -> Result<String> {
        if batch.is_empty() {
            return Ok(String::new());
        }
        let mut replies = Vec::new();
        for line in batch.split(BATCH_DELIMITER) {
            replies.push(self.send(line)?);
        }
        Ok(replies.join(BATCH_DELIMITER))
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, line: &str) -> Result<String> {
        (**self).send(line)
    }

    fn send_batch(&mut self, batch: &str) -> Result<String> {
        (**self).send_batch(batch)
    }
}

pub fn open_port(opts: &SerialOpts) -> Result<Box<dyn SerialPort>> {
    let builder = serialport::new(&opts.dev, opts.baud)
        .timeout(Duration::from_millis(100))
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(if opts.rtscts {
            FlowControl::Hardware
        } else {
            FlowControl::None
        });

    builder
        .open()
        .map_err(|e| anyhow!("open {}: {}", opts.dev, e))
}

/// CR/LF line transport over any byte stream.
pub struct LineTransport<P> {
    port: P,
    name: String,
    timeout: Duration,
}

pub type SerialTransport = LineTransport<Box<dyn SerialPort>>;

impl SerialTransport {
    pub fn open(opts: &SerialOpts) -> Result<Self> {
        let port = open_port(opts)?;
        debug!(dev = %opts.dev, baud = opts.baud, "serial port open");
        Ok(LineTransport::new(
            port,
            opts.dev.clone(),
            Duration::from_millis(opts.timeout_ms),
        ))
    }
}

impl<P> LineTransport<P> {
    pub fn new(port: P, name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port,
            name: name.into(),
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<P: Read> LineTransport<P> {
    /// Read one line without its CR/LF. `None` once the stream ends; a
    /// partial line cut off by the end is dropped. Reads byte-wise so
    /// nothing past the terminator is consumed.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let start = Instant::now();
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if start.elapsed() > self.timeout {
                bail!("{}: no line within {:?}", self.name, self.timeout);
            }
            match self.port.read(&mut byte) {
                Ok(0) => {
                    if !buf.is_empty() {
                        trace!(port = %self.name, dropped = buf.len(), "partial line at eof");
                    }
                    return Ok(None);
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buf.push(byte[0]);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("read from {}", self.name)),
            }
        }
        Ok(Some(
            String::from_utf8_lossy(&buf).trim_end_matches('\r').to_string(),
        ))
    }
}

impl<P: Write> LineTransport<P> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = Vec::with_capacity(line.len() + 2);
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
        self.port
            .write_all(&out)
            .with_context(|| format!("write to {}", self.name))?;
        self.port.flush().context("flush")?;
        Ok(())
    }
}

impl<P: Read + Write> Transport for LineTransport<P> {
    fn send(&mut self, line: &str) -> Result<String> {
        debug!(port = %self.name, tx = line);
        self.write_line(line)?;
        let Some(reply) = self.read_line()? else {
            bail!("{}: stream closed", self.name);
        };
        debug!(port = %self.name, rx = %reply);
        Ok(reply)
    }
}

/// Replays recorded replies, one line per request, ignoring what is sent.
pub struct ReplayTransport<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> ReplayTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl ReplayTransport<io::BufReader<std::fs::File>> {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open replay file {}", path.display()))?;
        Ok(Self::new(io::BufReader::new(file)))
    }
}

impl<R: BufRead> Transport for ReplayTransport<R> {
    fn send(&mut self, line: &str) -> Result<String> {
        let mut buf = String::new();
        loop {
            buf.clear();
            let n = self.reader.read_line(&mut buf).context("read replay")?;
            if n == 0 {
                bail!("replay exhausted after {} lines", self.line_no);
            }
            self.line_no += 1;
            let reply = buf.trim_end();
            if !reply.is_empty() {
                trace!(line_no = self.line_no, tx = line, rx = reply, "replay");
                return Ok(reply.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Scripted byte stream: reads come from `input`, writes land in `output`.
    struct Loopback {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn loopback(replies: &str) -> LineTransport<Loopback> {
        LineTransport::new(
            Loopback {
                input: Cursor::new(replies.as_bytes().to_vec()),
                output: Vec::new(),
            },
            "loop",
            Duration::from_secs(1),
        )
    }

    #[test]
    fn line_transport_terminates_and_strips() {
        let mut t = loopback("%R1P,0,0:0,1\r\n%R1P,0,0:0,2\r\n");
        assert_eq!(t.send("%R1Q,9019:").unwrap(), "%R1P,0,0:0,1");
        assert_eq!(t.send("%R1Q,18008:").unwrap(), "%R1P,0,0:0,2");
        assert_eq!(t.port.output, b"%R1Q,9019:\r\n%R1Q,18008:\r\n");
    }

    #[test]
    fn line_transport_reports_closed_stream() {
        let mut t = loopback("%R1P,0,0:0");
        assert!(t.send("%R1Q,9019:").is_err());
    }

    #[test]
    fn batch_goes_out_line_by_line() {
        let mut t = loopback("%R1P,0,0:0,1\r\n%R1P,0,0:0,3\r\n");
        let replies = t.send_batch("%R1Q,9019:|%R1Q,2021:").unwrap();
        assert_eq!(replies, "%R1P,0,0:0,1|%R1P,0,0:0,3");
    }

    #[test]
    fn empty_batch_sends_nothing() {
        let mut t = loopback("%R1P,0,0:0,1\r\n");
        assert_eq!(t.send_batch("").unwrap(), "");
        assert!(t.port.output.is_empty());
        assert_eq!(t.send("%R1Q,9019:").unwrap(), "%R1P,0,0:0,1");
    }

    #[test]
    fn read_line_ends_cleanly_at_eof() {
        let mut t = loopback("$GPGGA,1\r\n$GPRMC,2");
        assert_eq!(t.read_line().unwrap().as_deref(), Some("$GPGGA,1"));
        assert_eq!(t.read_line().unwrap(), None);
    }

    #[test]
    fn replay_skips_blank_lines_and_runs_out() {
        let mut t = ReplayTransport::new(Cursor::new("%R1P,0,0:0\n\n%R1P,0,0:0,2\n"));
        assert_eq!(t.send("a").unwrap(), "%R1P,0,0:0");
        assert_eq!(t.send("b").unwrap(), "%R1P,0,0:0,2");
        let err = t.send("c").unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }
}

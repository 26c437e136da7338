//! TCP session with a TiVo receiver on port 31339.
//!
//! One connection per command: connect, write one line, wait, read once,
//! close. The receiver only serves one client at a time, so nothing is
//! pooled or kept open between commands. No application logic: callers
//! decide what to send and how to interpret the reply.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::frame::{CommandLine, ReplyLine};
use crate::protocol::Command;

/// Default receiver control port.
pub const DEFAULT_PORT: u16 = 31339;

/// Connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between writing a line and reading the reply.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

/// Upper bound for a single reply read.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Payload that stands in for a reply when the receiver stays silent.
pub const TIMEOUT_SENTINEL: &[u8] = b"no_channel Video";

/// Result of one request/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Bytes read from the receiver (possibly empty if it hung up).
    Data(Vec<u8>),
    /// Nothing arrived within the read timeout.
    TimedOut,
}

impl Response {
    /// Raw payload; [`TIMEOUT_SENTINEL`] for a timed-out exchange.
    pub fn payload(&self) -> &[u8] {
        match self {
            Response::Data(bytes) => bytes,
            Response::TimedOut => TIMEOUT_SENTINEL,
        }
    }

    /// Tokenized payload.
    pub fn reply(&self) -> ReplyLine {
        ReplyLine::parse(self.payload())
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Response::TimedOut)
    }
}

/// Errors from connection operations.
///
/// Read timeouts are not errors: they come back as [`Response::TimedOut`].
#[derive(Debug)]
pub enum ConnError {
    /// Connect, DNS, or write failure.
    Io(io::Error),
    /// Host name resolved to no addresses.
    Resolve { target: String },
}

impl fmt::Display for ConnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnError::Io(e) => write!(f, "I/O error: {e}"),
            ConnError::Resolve { target } => write!(f, "{target} resolved to no addresses"),
        }
    }
}

impl std::error::Error for ConnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnError::Io(e) => Some(e),
            ConnError::Resolve { .. } => None,
        }
    }
}

impl From<io::Error> for ConnError {
    fn from(e: io::Error) -> Self {
        ConnError::Io(e)
    }
}

/// Anything that can carry a [`Command`] to a receiver and bring back its reply.
///
/// [`Session`] is the TCP implementation; tests substitute scripted fakes.
pub trait Transport {
    fn execute(&mut self, cmd: &Command) -> Result<Response, ConnError>;
}

/// Where and how to reach a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Applies to connect, write and read separately.
    pub timeout: Duration,
    pub settle: Duration,
    pub buffer_size: usize,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
            settle: DEFAULT_SETTLE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// `host:port`, for logging.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connect-per-command session with a receiver.
///
/// Synchronous. Each [`execute_line`](Self::execute_line) opens a fresh TCP
/// connection and closes it again before returning, on success and error
/// alike.
///
/// # Example
///
/// ```no_run
/// use tivolink::conn::{Session, SessionConfig, DEFAULT_PORT};
/// use tivolink::protocol::{Command, IrCode};
/// use tivolink::Transport;
///
/// let mut session = Session::new(SessionConfig::new("192.168.1.50", DEFAULT_PORT));
/// let response = session.execute(&Command::Ir(IrCode::Pause))?;
/// println!("{:?}", response.reply().tokens());
/// # Ok::<(), tivolink::ConnError>(())
/// ```
pub struct Session {
    config: SessionConfig,
    /// Called before every line is written.
    on_send: Option<Box<dyn FnMut(&CommandLine) + Send>>,
    /// Called after every exchange that produced a [`Response`].
    on_recv: Option<Box<dyn FnMut(&Response) + Send>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, on_send: None, on_recv: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a callback invoked before every line is written.
    pub fn set_on_send(&mut self, f: impl FnMut(&CommandLine) + Send + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register a callback invoked after every completed exchange.
    pub fn set_on_recv(&mut self, f: impl FnMut(&Response) + Send + 'static) {
        self.on_recv = Some(Box::new(f));
    }

    /// Send one pre-encoded line and wait for the reply.
    ///
    /// Connect and write failures propagate. A silent receiver yields
    /// [`Response::TimedOut`] after the configured timeout.
    pub fn execute_line(&mut self, line: &CommandLine) -> Result<Response, ConnError> {
        if let Some(cb) = self.on_send.as_mut() {
            cb(line);
        }
        debug!(target_addr = %self.config.target(), %line, "sending request");

        let mut stream = self.connect()?;
        let result = self.exchange(&mut stream, line);
        // Close on every path; the receiver will not accept the next client
        // until this one is gone.
        let _ = stream.shutdown(Shutdown::Both);
        drop(stream);

        let response = result?;
        match &response {
            Response::Data(bytes) => {
                debug!(reply = %String::from_utf8_lossy(bytes).trim(), "received response");
            }
            Response::TimedOut => {
                warn!(
                    target_addr = %self.config.target(),
                    timeout = ?self.config.timeout,
                    "receiver did not answer"
                );
            }
        }
        if let Some(cb) = self.on_recv.as_mut() {
            cb(&response);
        }
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn connect(&self) -> Result<TcpStream, ConnError> {
        let addrs: Vec<SocketAddr> =
            (self.config.host.as_str(), self.config.port).to_socket_addrs()?.collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.config.timeout) {
                Ok(stream) => {
                    // One short line each way; disable Nagle to avoid latency.
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(ConnError::Io(e)),
            None => Err(ConnError::Resolve { target: self.config.target() }),
        }
    }

    fn exchange(&self, stream: &mut TcpStream, line: &CommandLine) -> Result<Response, ConnError> {
        stream.set_write_timeout(Some(self.config.timeout))?;
        stream.write_all(line.as_bytes())?;
        stream.flush()?;

        thread::sleep(self.config.settle);

        stream.set_read_timeout(Some(self.config.timeout))?;
        let mut buf = vec![0u8; self.config.buffer_size];
        match stream.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Response::Data(buf))
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(Response::TimedOut)
            }
            Err(e) => Err(ConnError::Io(e)),
        }
    }
}

impl Transport for Session {
    fn execute(&mut self, cmd: &Command) -> Result<Response, ConnError> {
        self.execute_line(&cmd.encode())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! TCP connection to the VLC RC interface.
//!
//! The connection is a plain byte stream. Line helpers are provided because
//! the RC interface speaks one command per line, but nothing here knows the
//! command vocabulary.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::target::Target;

/// Silence that ends the greeting banner VLC prints on connect.
const BANNER_TIMEOUT: Duration = Duration::from_millis(100);

/// Prompt VLC prefixes to its output when it believes it talks to a tty.
const PROMPT: &str = "> ";

#[derive(Error, Debug)]
pub enum ConnectionError {
  #[error("Connection to {addr} refused: {source}")]
  ConnectionRefused {
    addr: String,
    #[source]
    source: io::Error,
  },
  #[error("Not connected")]
  NotConnected,
  #[error("Timed out waiting for VLC")]
  Timeout,
  #[error("Connection closed by VLC")]
  Disconnected,
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

impl ConnectionError {
  pub fn is_connection_refused(&self) -> bool {
    matches!(self, ConnectionError::ConnectionRefused { .. })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Disconnected,
  Connected,
}

/// Single RC connection. Connected iff a socket is held.
pub struct Connection {
  target: Target,
  connect_timeout: Duration,
  read_timeout: Duration,
  stream: Option<BufReader<TcpStream>>,
  /// Bytes of a line whose read timed out before its terminator arrived.
  pending: Vec<u8>,
}

impl Connection {
  pub fn new(target: Target, connect_timeout: Duration, read_timeout: Duration) -> Self {
    Self {
      target,
      connect_timeout,
      read_timeout,
      stream: None,
      pending: Vec::new(),
    }
  }

  pub fn target(&self) -> &Target {
    &self.target
  }

  pub fn state(&self) -> ConnectionState {
    if self.stream.is_some() {
      ConnectionState::Connected
    } else {
      ConnectionState::Disconnected
    }
  }

  pub fn is_connected(&self) -> bool {
    self.state() == ConnectionState::Connected
  }

  /// Open the socket. Already connected is a no-op; the live socket is kept.
  pub fn connect(&mut self) -> Result<(), ConnectionError> {
    if self.is_connected() {
      log::debug!("Already connected to {}, keeping the connection", self.target);
      return Ok(());
    }

    let stream = self.open()?;
    let mut reader = BufReader::new(stream);
    // A peer that resets or hangs up during the greeting has not accepted us.
    drain_banner(&mut reader, self.connect_timeout)
      .and_then(|_| reader.get_ref().set_read_timeout(Some(self.read_timeout)))
      .map_err(|source| {
        let _ = reader.get_ref().shutdown(Shutdown::Both);
        ConnectionError::ConnectionRefused {
          addr: self.target.to_string(),
          source,
        }
      })?;

    self.pending.clear();
    self.stream = Some(reader);
    log::info!("Connected to VLC RC interface on {}", self.target);
    Ok(())
  }

  fn open(&self) -> Result<TcpStream, ConnectionError> {
    let refused = |source| ConnectionError::ConnectionRefused {
      addr: self.target.to_string(),
      source,
    };

    let mut last_error = None;
    for addr in self.target.resolve().map_err(refused)? {
      match TcpStream::connect_timeout(&addr, self.connect_timeout) {
        Ok(stream) => {
          stream.set_nodelay(true)?;
          return Ok(stream);
        }
        Err(e) => {
          log::debug!("Connect to {} failed: {}", addr, e);
          last_error = Some(e);
        }
      }
    }

    Err(refused(last_error.unwrap_or_else(|| {
      io::Error::new(io::ErrorKind::ConnectionRefused, "no address accepted")
    })))
  }

  /// Close the socket if open. Idempotent.
  pub fn disconnect(&mut self) {
    self.pending.clear();
    if let Some(reader) = self.stream.take() {
      let _ = reader.get_ref().shutdown(Shutdown::Both);
      log::info!("Disconnected from {}", self.target);
    }
  }

  /// Write raw bytes.
  pub fn send(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
    let reader = self.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
    let mut stream = reader.get_ref();
    let result = stream.write_all(data).and_then(|_| stream.flush());
    result.map_err(|e| self.io_failure(e))
  }

  /// Read whatever raw bytes are available, up to `buf.len()`.
  pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, ConnectionError> {
    let reader = self.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
    if !self.pending.is_empty() {
      let n = buf.len().min(self.pending.len());
      buf[..n].copy_from_slice(&self.pending[..n]);
      self.pending.drain(..n);
      return Ok(n);
    }
    match reader.read(buf) {
      Ok(0) if !buf.is_empty() => Err(self.peer_closed()),
      Ok(n) => Ok(n),
      Err(e) => Err(self.io_failure(e)),
    }
  }

  /// Send one command line.
  pub fn write_line(&mut self, line: &str) -> Result<(), ConnectionError> {
    log::debug!("RC >> {}", line);
    let mut data = Vec::with_capacity(line.len() + 1);
    data.extend_from_slice(line.as_bytes());
    data.push(b'\n');
    self.send(&data)
  }

  /// Read one line, without its terminator or a leading prompt.
  ///
  /// On `Timeout` the bytes received so far are kept and the next call
  /// continues the same line.
  pub fn read_line(&mut self) -> Result<String, ConnectionError> {
    let reader = self.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
    match reader.read_until(b'\n', &mut self.pending) {
      Ok(0) => Err(self.peer_closed()),
      Ok(_) => {
        let raw = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&raw);
        let line = text.trim_end_matches(['\r', '\n']);
        let line = line.trim_start_matches(PROMPT).to_string();
        log::debug!("RC << {}", line);
        Ok(line)
      }
      Err(e) => Err(self.io_failure(e)),
    }
  }

  /// Send a command line and read the first line of the reply.
  pub fn command(&mut self, line: &str) -> Result<String, ConnectionError> {
    self.write_line(line)?;
    self.read_line()
  }

  fn peer_closed(&mut self) -> ConnectionError {
    log::warn!("VLC closed the RC connection on {}", self.target);
    self.stream = None;
    self.pending.clear();
    ConnectionError::Disconnected
  }

  fn io_failure(&mut self, e: io::Error) -> ConnectionError {
    match e.kind() {
      io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ConnectionError::Timeout,
      io::ErrorKind::BrokenPipe
      | io::ErrorKind::ConnectionReset
      | io::ErrorKind::ConnectionAborted
      | io::ErrorKind::UnexpectedEof => self.peer_closed(),
      _ => ConnectionError::Io(e),
    }
  }
}

impl Drop for Connection {
  fn drop(&mut self) {
    self.disconnect();
  }
}

/// Discard the greeting VLC prints right after accepting a client.
///
/// Stops after `BANNER_TIMEOUT` of silence or once `limit` has elapsed,
/// whichever comes first. End of stream is an error.
fn drain_banner(reader: &mut BufReader<TcpStream>, limit: Duration) -> io::Result<()> {
  reader.get_ref().set_read_timeout(Some(BANNER_TIMEOUT))?;
  let deadline = Instant::now() + limit;
  loop {
    if Instant::now() >= deadline {
      log::debug!("Peer still talking after {:?}, leaving the rest buffered", limit);
      return Ok(());
    }
    let available = match reader.fill_buf() {
      Ok(buf) => buf.len(),
      Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
        return Ok(());
      }
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    };
    if available == 0 {
      return Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed during greeting",
      ));
    }
    reader.consume(available);
  }
}

//! High-level VLC client combining instance management and the RC connection.

use thiserror::Error;

use super::connection::{Connection, ConnectionError};
use super::process::ProcessError;
use super::retry::{retry_on_refused, RetryPolicy, MAX_CONNECT_ATTEMPTS};
use super::server::Server;
use crate::config::ClientConfig;

#[derive(Error, Debug)]
pub enum VlcError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),
  #[error("Connection error: {0}")]
  Connection(#[from] ConnectionError),
  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),
}

impl VlcError {
  pub fn is_connection_refused(&self) -> bool {
    matches!(self, VlcError::Connection(e) if e.is_connection_refused())
  }
}

/// High-level VLC client.
///
/// With `auto_start` the client owns a dedicated instance: it is started on
/// construction and stopped by [`VlcClient::stop`] or when the client drops.
pub struct VlcClient {
  config: ClientConfig,
  server: Server,
  connection: Connection,
}

impl VlcClient {
  /// Build a client, starting VLC and connecting when `auto_start` is set.
  ///
  /// Fails with a `ConnectionRefused` connection error when the RC port
  /// still refuses after three attempts. Nothing usable is returned then,
  /// and an instance started here is stopped again.
  pub fn new(config: ClientConfig) -> Result<Self, VlcError> {
    config.validate().map_err(VlcError::InvalidConfig)?;

    let mut client = Self {
      server: Server::from_config(&config),
      connection: Connection::new(
        config.target(),
        config.connect_timeout(),
        config.read_timeout(),
      ),
      config,
    };

    if client.config.auto_start {
      client.server.start()?;

      let policy = RetryPolicy::new(MAX_CONNECT_ATTEMPTS, client.config.retry_delay());
      let connection = &mut client.connection;
      retry_on_refused(&policy, |attempt| {
        log::debug!("Connecting to {} (attempt {})", connection.target(), attempt);
        connection.connect()
      })?;
    }

    Ok(client)
  }

  /// Client with the default configuration (localhost:9595, auto start, headless).
  pub fn with_defaults() -> Result<Self, VlcError> {
    Self::new(ClientConfig::default())
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  pub fn host(&self) -> &str {
    &self.config.host
  }

  pub fn port(&self) -> u16 {
    self.config.port
  }

  pub fn auto_start(&self) -> bool {
    self.config.auto_start
  }

  /// Whether the managed instance runs without GUI, as configured.
  pub fn headless(&self) -> bool {
    self.config.headless
  }

  /// Pid of the self-managed instance, if any.
  pub fn pid(&self) -> Option<u32> {
    self.server.pid()
  }

  /// Check if VLC answers on the RC port.
  pub fn is_running(&self) -> bool {
    self.server.is_running()
  }

  pub fn is_started(&self) -> bool {
    self.is_running()
  }

  /// Start a VLC instance in a subprocess.
  ///
  /// Returns the pid, or `None` when VLC is already running.
  pub fn start(&mut self) -> Result<Option<u32>, VlcError> {
    Ok(self.server.start()?)
  }

  /// Disconnect, then stop the self-managed instance.
  ///
  /// Returns the terminated pid, or `None` when this client started nothing.
  pub fn stop(&mut self) -> Result<Option<u32>, VlcError> {
    self.disconnect();
    Ok(self.server.stop()?)
  }

  /// Connect to the RC interface.
  pub fn connect(&mut self) -> Result<(), VlcError> {
    Ok(self.connection.connect()?)
  }

  /// Disconnect from the RC interface. Idempotent.
  pub fn disconnect(&mut self) {
    self.connection.disconnect();
  }

  /// Check if connected.
  pub fn is_connected(&self) -> bool {
    self.connection.is_connected()
  }

  /// Send raw bytes to the RC interface.
  pub fn send(&mut self, data: &[u8]) -> Result<(), VlcError> {
    Ok(self.connection.send(data)?)
  }

  /// Receive raw bytes from the RC interface.
  pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, VlcError> {
    Ok(self.connection.receive(buf)?)
  }

  pub fn write_line(&mut self, line: &str) -> Result<(), VlcError> {
    Ok(self.connection.write_line(line)?)
  }

  pub fn read_line(&mut self) -> Result<String, VlcError> {
    Ok(self.connection.read_line()?)
  }

  /// Send a command and return the first reply line.
  pub fn command(&mut self, line: &str) -> Result<String, VlcError> {
    Ok(self.connection.command(line)?)
  }
}

impl Drop for VlcClient {
  fn drop(&mut self) {
    // Close the socket before the server reaps the process.
    self.connection.disconnect();
  }
}

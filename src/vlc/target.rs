//! Address of a VLC remote-control interface.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Where a controllable VLC instance should be reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
  host: String,
  port: u16,
}

impl Target {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
    }
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn port(&self) -> u16 {
    self.port
  }

  /// Resolve the target to socket addresses, in resolver order.
  pub fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
      return Err(io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("{} did not resolve to any address", self.host),
      ));
    }
    Ok(addrs)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.host, self.port)
  }
}

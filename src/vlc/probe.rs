//! Reachability checks against the RC port.

use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::target::Target;

/// Anything that can tell whether a VLC RC interface answers right now.
pub trait Reachability {
  fn is_reachable(&self) -> bool;
}

/// Connect-and-close probe. Any failure counts as "not reachable".
#[derive(Debug, Clone)]
pub struct TcpProbe {
  target: Target,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(target: Target, timeout: Duration) -> Self {
    Self { target, timeout }
  }

  pub fn target(&self) -> &Target {
    &self.target
  }
}

impl Reachability for TcpProbe {
  fn is_reachable(&self) -> bool {
    let addrs = match self.target.resolve() {
      Ok(addrs) => addrs,
      Err(e) => {
        log::debug!("Probe could not resolve {}: {}", self.target, e);
        return false;
      }
    };

    for addr in addrs {
      match TcpStream::connect_timeout(&addr, self.timeout) {
        Ok(stream) => {
          let _ = stream.shutdown(Shutdown::Both);
          log::debug!("Probe reached {} via {}", self.target, addr);
          return true;
        }
        Err(e) => log::debug!("Probe to {} failed: {}", addr, e),
      }
    }

    false
  }
}

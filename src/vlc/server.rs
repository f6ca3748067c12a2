//! Lifecycle of a self-managed VLC instance.

use std::path::PathBuf;
use std::process::Child;
use std::time::Duration;

use super::probe::{Reachability, TcpProbe};
use super::process::{spawn_vlc, terminate, ProcessError};
use super::target::Target;
use crate::config::ClientConfig;

/// A VLC process this server spawned and has not reaped yet.
#[derive(Debug)]
pub struct InstanceHandle {
  pid: u32,
  headless: bool,
  child: Child,
}

impl InstanceHandle {
  pub fn pid(&self) -> u32 {
    self.pid
  }

  pub fn headless(&self) -> bool {
    self.headless
  }
}

/// Detects, starts and stops the VLC instance behind one RC target.
#[derive(Debug)]
pub struct Server {
  target: Target,
  headless: bool,
  vlc_path: Option<PathBuf>,
  extra_args: Vec<String>,
  stop_timeout: Duration,
  probe: TcpProbe,
  instance: Option<InstanceHandle>,
}

impl Server {
  pub fn new(target: Target, headless: bool) -> Self {
    Self::from_config(&ClientConfig {
      host: target.host().to_string(),
      port: target.port(),
      headless,
      ..Default::default()
    })
  }

  pub fn from_config(config: &ClientConfig) -> Self {
    let target = config.target();
    Self {
      probe: TcpProbe::new(target.clone(), config.probe_timeout()),
      target,
      headless: config.headless,
      vlc_path: config.vlc_path(),
      extra_args: config.vlc_args.clone(),
      stop_timeout: config.stop_timeout(),
      instance: None,
    }
  }

  pub fn target(&self) -> &Target {
    &self.target
  }

  pub fn headless(&self) -> bool {
    self.headless
  }

  /// The process this server spawned, if it still tracks one.
  pub fn instance(&self) -> Option<&InstanceHandle> {
    self.instance.as_ref()
  }

  pub fn pid(&self) -> Option<u32> {
    self.instance.as_ref().map(InstanceHandle::pid)
  }

  /// Whether anything answers on the RC port, whoever started it.
  pub fn is_running(&self) -> bool {
    self.probe.is_reachable()
  }

  /// Spawn VLC unless an instance is already reachable or still booting.
  ///
  /// Returns the new pid, or `None` when nothing was started.
  pub fn start(&mut self) -> Result<Option<u32>, ProcessError> {
    if self.is_running() {
      log::info!(
        "VLC already listening on {}, not starting another instance",
        self.target
      );
      return Ok(None);
    }

    if let Some(handle) = self.instance.as_mut() {
      let pid = handle.pid;
      match handle.child.try_wait() {
        Ok(None) => {
          log::debug!("VLC (pid: {}) is still starting up", pid);
          return Ok(None);
        }
        Ok(Some(status)) => {
          log::warn!("Previous VLC (pid: {}) exited with {}", pid, status);
          self.instance = None;
        }
        Err(source) => return Err(ProcessError::WaitFailed { pid, source }),
      }
    }

    let child = spawn_vlc(
      self.vlc_path.as_deref(),
      &self.target,
      self.headless,
      &self.extra_args,
    )?;
    let pid = child.id();
    log::info!("VLC started (pid: {})", pid);

    self.instance = Some(InstanceHandle {
      pid,
      headless: self.headless,
      child,
    });
    Ok(Some(pid))
  }

  /// Terminate the spawned VLC and wait for it.
  ///
  /// Returns the terminated pid, or `None` when nothing was tracked.
  pub fn stop(&mut self) -> Result<Option<u32>, ProcessError> {
    let Some(mut handle) = self.instance.take() else {
      log::debug!("No self-managed VLC to stop");
      return Ok(None);
    };

    log::info!("Stopping VLC (pid: {})", handle.pid);
    match terminate(&mut handle.child, self.stop_timeout) {
      Ok(status) => {
        log::info!("VLC process exited with: {}", status);
        Ok(Some(handle.pid))
      }
      Err(e) => {
        // Still unreaped, keep tracking it.
        self.instance = Some(handle);
        Err(e)
      }
    }
  }
}

impl Drop for Server {
  fn drop(&mut self) {
    if self.instance.is_some() {
      if let Err(e) = self.stop() {
        log::error!("Failed to stop VLC on drop: {}", e);
      }
    }
  }
}

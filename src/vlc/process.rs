//! VLC process detection, spawning and termination.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;

use super::target::Target;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("VLC executable not found")]
  NotFound,
  #[error("Failed to spawn VLC: {0}")]
  SpawnFailed(#[source] io::Error),
  #[error("Failed to signal VLC (pid {pid}): {reason}")]
  SignalFailed { pid: u32, reason: String },
  #[error("Failed to wait for VLC (pid {pid}): {source}")]
  WaitFailed {
    pid: u32,
    #[source]
    source: io::Error,
  },
}

#[cfg(windows)]
const INSTALL_PATHS: &[&str] = &[
  r"C:\Program Files\VideoLAN\VLC\vlc.exe",
  r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe",
];
#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
  "/Applications/VLC.app/Contents/MacOS/VLC",
  "/usr/local/bin/vlc",
  "/opt/homebrew/bin/vlc",
];
#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &["/usr/bin/vlc", "/usr/local/bin/vlc", "/snap/bin/vlc"];
#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
const INSTALL_PATHS: &[&str] = &[];

/// Locate VLC on PATH, then in the platform's usual install locations.
pub fn find_vlc() -> Option<PathBuf> {
  which::which("vlc").ok().or_else(|| {
    INSTALL_PATHS
      .iter()
      .map(PathBuf::from)
      .find(|p| p.is_file())
  })
}

/// Arguments that bring up the RC interface on `target`.
pub fn rc_args(target: &Target, headless: bool) -> Vec<String> {
  let mut args = Vec::new();
  if headless {
    args.push("--intf=dummy".to_string());
  }
  args.push("--extraintf=rc".to_string());
  args.push(format!("--rc-host={}", target));
  // Without a tty on stdin the RC interface refuses to start.
  #[cfg(unix)]
  args.push("--rc-fake-tty".to_string());
  args.push("--no-one-instance".to_string());
  args
}

/// Spawn VLC with the RC interface enabled. Does not wait for it to listen.
pub fn spawn_vlc(
  vlc_path: Option<&Path>,
  target: &Target,
  headless: bool,
  extra_args: &[String],
) -> Result<Child, ProcessError> {
  let vlc_exe = vlc_path
    .map(Path::to_path_buf)
    .or_else(find_vlc)
    .ok_or(ProcessError::NotFound)?;

  log::info!(
    "Spawning VLC: {:?} with RC on {} (headless: {})",
    vlc_exe,
    target,
    headless
  );
  if !extra_args.is_empty() {
    log::info!("Extra VLC args: {:?}", extra_args);
  }

  let child = Command::new(&vlc_exe)
    .args(rc_args(target, headless))
    .args(extra_args)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .map_err(ProcessError::SpawnFailed)?;

  Ok(child)
}

/// Ask the child to exit, kill it after `grace`, and reap it.
pub fn terminate(child: &mut Child, grace: Duration) -> Result<ExitStatus, ProcessError> {
  let pid = child.id();

  if let Some(status) = try_reap(child)? {
    log::debug!("VLC (pid: {}) already exited with {}", pid, status);
    return Ok(status);
  }

  if let Some(status) = request_exit(child, grace)? {
    return Ok(status);
  }

  if let Err(e) = child.kill() {
    // InvalidInput means it exited between the last check and now.
    if e.kind() != io::ErrorKind::InvalidInput {
      return Err(ProcessError::SignalFailed {
        pid,
        reason: e.to_string(),
      });
    }
  }

  child
    .wait()
    .map_err(|source| ProcessError::WaitFailed { pid, source })
}

fn try_reap(child: &mut Child) -> Result<Option<ExitStatus>, ProcessError> {
  let pid = child.id();
  child
    .try_wait()
    .map_err(|source| ProcessError::WaitFailed { pid, source })
}

/// SIGTERM, then poll until `grace` runs out.
#[cfg(unix)]
fn request_exit(child: &mut Child, grace: Duration) -> Result<Option<ExitStatus>, ProcessError> {
  use nix::errno::Errno;
  use nix::sys::signal::{kill, Signal};
  use nix::unistd::Pid;
  use std::thread;
  use std::time::Instant;

  let pid = child.id();
  log::debug!("Sending SIGTERM to VLC (pid: {})", pid);
  match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
    Ok(()) | Err(Errno::ESRCH) => {}
    Err(e) => {
      return Err(ProcessError::SignalFailed {
        pid,
        reason: e.to_string(),
      })
    }
  }

  let deadline = Instant::now() + grace;
  loop {
    if let Some(status) = try_reap(child)? {
      log::debug!("VLC (pid: {}) terminated gracefully", pid);
      return Ok(Some(status));
    }
    if Instant::now() >= deadline {
      break;
    }
    thread::sleep(Duration::from_millis(50));
  }

  log::warn!(
    "VLC (pid: {}) still running after {:?}, killing it",
    pid,
    grace
  );
  Ok(None)
}

#[cfg(not(unix))]
fn request_exit(_child: &mut Child, _grace: Duration) -> Result<Option<ExitStatus>, ProcessError> {
  Ok(None)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_headless_args_disable_gui() {
    let args = rc_args(&Target::new("localhost", 9595), true);
    assert_eq!(args[0], "--intf=dummy");
    assert!(args.contains(&"--extraintf=rc".to_string()));
    assert!(args.contains(&"--rc-host=localhost:9595".to_string()));
  }

  #[test]
  fn test_gui_args_keep_default_interface() {
    let args = rc_args(&Target::new("127.0.0.1", 4212), false);
    assert!(!args.iter().any(|a| a.starts_with("--intf")));
    assert!(args.contains(&"--rc-host=127.0.0.1:4212".to_string()));
  }

  #[test]
  fn test_install_paths_are_absolute() {
    assert!(INSTALL_PATHS.iter().all(|p| Path::new(p).is_absolute()));
  }

  #[test]
  fn test_spawn_missing_binary_fails() {
    let result = spawn_vlc(
      Some(Path::new("/nonexistent/definitely-not-vlc")),
      &Target::new("127.0.0.1", 9595),
      true,
      &[],
    );
    assert!(matches!(result, Err(ProcessError::SpawnFailed(_))));
  }
}

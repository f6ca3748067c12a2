//! Instance lifecycle against a stand-in player executable.
//!
//! The stand-in is a shell script that ignores the RC flags and sleeps, so
//! it behaves like a VLC that never opens its port.
#![cfg(unix)]

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use vlc_client::{ClientConfig, Reachability, Server, TcpProbe, VlcClient};

struct FakeVlc {
  _dir: TempDir,
  path: PathBuf,
}

fn fake_vlc() -> FakeVlc {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("vlc");
  fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  FakeVlc { _dir: dir, path }
}

fn unused_port() -> u16 {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  listener.local_addr().unwrap().port()
}

fn config(port: u16, fake: &FakeVlc) -> ClientConfig {
  ClientConfig {
    host: "127.0.0.1".into(),
    port,
    vlc_path: Some(fake.path.to_string_lossy().into_owned()),
    probe_timeout_ms: 100,
    connect_timeout_ms: 200,
    retry_delay_ms: 10,
    stop_timeout_ms: 1000,
    ..Default::default()
  }
}

fn pid_alive(pid: u32) -> bool {
  Command::new("kill")
    .args(["-0", &pid.to_string()])
    .stderr(Stdio::null())
    .status()
    .map(|s| s.success())
    .unwrap_or(false)
}

#[test]
fn start_twice_spawns_once() {
  let fake = fake_vlc();
  let mut server = Server::from_config(&config(unused_port(), &fake));

  let pid = server.start().unwrap().expect("first start spawns");
  assert_eq!(server.start().unwrap(), None);
  assert_eq!(server.pid(), Some(pid));
  assert!(server.instance().unwrap().headless());

  assert_eq!(server.stop().unwrap(), Some(pid));
}

#[test]
fn stop_terminates_and_clears_handle() {
  let fake = fake_vlc();
  let port = unused_port();
  let mut server = Server::from_config(&config(port, &fake));

  let pid = server.start().unwrap().unwrap();
  assert_eq!(server.stop().unwrap(), Some(pid));
  assert!(server.instance().is_none());
  assert!(!pid_alive(pid));
  assert!(!server.is_running());

  assert_eq!(server.stop().unwrap(), None);
}

#[test]
fn start_restarts_after_instance_died() {
  let fake = fake_vlc();
  let mut server = Server::from_config(&config(unused_port(), &fake));

  let first = server.start().unwrap().unwrap();
  Command::new("kill")
    .args(["-9", &first.to_string()])
    .status()
    .unwrap();
  // Give the kernel a moment to mark it exited.
  std::thread::sleep(Duration::from_millis(100));

  let second = server.start().unwrap().expect("dead instance is replaced");
  assert_ne!(first, second);
  assert_eq!(server.stop().unwrap(), Some(second));
}

#[test]
fn dropping_server_stops_instance() {
  let fake = fake_vlc();
  let pid = {
    let mut server = Server::from_config(&config(unused_port(), &fake));
    server.start().unwrap().unwrap()
  };
  assert!(!pid_alive(pid));
}

#[test]
fn auto_start_gives_up_with_connection_refused() {
  let fake = fake_vlc();
  let started = Instant::now();

  let err = match VlcClient::new(config(unused_port(), &fake)) {
    Ok(_) => panic!("nothing listens, construction must fail"),
    Err(e) => e,
  };

  assert!(err.is_connection_refused(), "unexpected error: {}", err);
  // Bounded: three short attempts, not an endless loop.
  assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn auto_start_makes_three_connect_attempts() {
  let fake = fake_vlc();
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();
  let done = Arc::new(AtomicBool::new(false));

  // Accepts and hangs up straight away, so every connect is refused
  // during the greeting while the port still looks reachable.
  let hang_up = {
    let done = Arc::clone(&done);
    thread::spawn(move || {
      let mut accepted: u32 = 0;
      for stream in listener.incoming() {
        if done.load(Ordering::SeqCst) {
          break;
        }
        drop(stream);
        accepted += 1;
      }
      accepted
    })
  };

  let err = match VlcClient::new(config(port, &fake)) {
    Ok(_) => panic!("every connection is hung up, construction must fail"),
    Err(e) => e,
  };
  assert!(err.is_connection_refused(), "unexpected error: {}", err);

  done.store(true, Ordering::SeqCst);
  let _ = std::net::TcpStream::connect(("127.0.0.1", port));
  let accepted = hang_up.join().unwrap();

  // One reachability check from start(), then the connect attempts.
  assert_eq!(accepted, 1 + vlc_client::vlc::MAX_CONNECT_ATTEMPTS);
}

#[test]
fn auto_start_connects_to_running_instance() {
  let fake = fake_vlc();
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();

  let mut client = VlcClient::new(config(port, &fake)).unwrap();
  assert!(client.is_connected());
  assert!(client.is_started());
  // Someone else owns the instance, so nothing was spawned.
  assert_eq!(client.pid(), None);

  assert_eq!(client.stop().unwrap(), None);
  assert!(!client.is_connected());
}

#[test]
fn manual_client_round_trip() {
  let fake = fake_vlc();
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();

  let mut client = VlcClient::new(ClientConfig {
    auto_start: false,
    ..config(port, &fake)
  })
  .unwrap();
  assert!(!client.is_connected());

  client.connect().unwrap();
  assert!(client.is_connected());
  client.disconnect();
  assert!(!client.is_connected());
  client.disconnect();
  assert!(!client.is_connected());
}

#[test]
fn probe_tracks_external_listener() {
  let port = unused_port();
  let probe = TcpProbe::new(
    vlc_client::Target::new("127.0.0.1", port),
    Duration::from_millis(100),
  );
  assert!(!probe.is_reachable());

  let _listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
  assert!(probe.is_reachable());
}

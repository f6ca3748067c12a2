//! VLC RC module - spawns and controls an external VLC player over TCP.
//!
//! Architecture:
//! - `target.rs` - host/port of the RC interface
//! - `probe.rs` - reachability check used to tell whether VLC is running
//! - `process.rs` - VLC binary detection, spawning and termination
//! - `server.rs` - lifecycle of a self-managed instance
//! - `connection.rs` - the TCP connection and its state machine
//! - `retry.rs` - bounded connect retry
//! - `client.rs` - high-level client tying it all together

mod client;
mod connection;
mod probe;
mod process;
mod retry;
mod server;
mod target;

pub use client::{VlcClient, VlcError};
pub use connection::{Connection, ConnectionError, ConnectionState};
pub use probe::{Reachability, TcpProbe};
pub use process::{find_vlc, rc_args, ProcessError};
pub use retry::{retry_on_refused, RetryPolicy, MAX_CONNECT_ATTEMPTS};
pub use server::{InstanceHandle, Server};
pub use target::Target;

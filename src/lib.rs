//! Client for the VLC remote-control (RC) interface.
//!
//! [`VlcClient`] starts and stops a dedicated VLC process and keeps a TCP
//! connection to its RC interface:
//!
//! ```no_run
//! use vlc_client::{ClientConfig, VlcClient};
//!
//! let mut vlc = VlcClient::new(ClientConfig::default())?;
//! vlc.write_line("add /tmp/song.ogg")?;
//! vlc.stop()?;
//! # Ok::<(), vlc_client::VlcError>(())
//! ```

mod config;
pub mod vlc;

pub use config::{default_config_path, ClientConfig};
pub use vlc::{
  Connection, ConnectionError, ConnectionState, ProcessError, Reachability, Server, Target,
  TcpProbe, VlcClient, VlcError,
};

//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::vlc::Target;

/// Client configuration. Unknown keys are ignored, missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
  /// Host of the VLC RC interface.
  #[serde(default = "default_host")]
  pub host: String,

  /// Port of the VLC RC interface.
  #[serde(default = "default_port")]
  pub port: u16,

  /// Manage a dedicated VLC instance and connect on construction.
  #[serde(default = "default_true", alias = "auto_start")]
  pub auto_start: bool,

  /// Run the managed instance without its GUI.
  #[serde(default = "default_true")]
  pub headless: bool,

  /// Custom VLC executable path (None = auto-detect).
  #[serde(default, alias = "vlc_path")]
  pub vlc_path: Option<String>,

  /// Additional VLC command-line arguments.
  #[serde(default, alias = "vlc_args")]
  pub vlc_args: Vec<String>,

  #[serde(default = "default_probe_timeout_ms", alias = "probe_timeout_ms")]
  pub probe_timeout_ms: u64,

  #[serde(default = "default_connect_timeout_ms", alias = "connect_timeout_ms")]
  pub connect_timeout_ms: u64,

  #[serde(default = "default_read_timeout_ms", alias = "read_timeout_ms")]
  pub read_timeout_ms: u64,

  /// Pause between connect attempts while a started instance comes up.
  #[serde(default = "default_retry_delay_ms", alias = "retry_delay_ms")]
  pub retry_delay_ms: u64,

  /// Grace period between the termination signal and a hard kill.
  #[serde(default = "default_stop_timeout_ms", alias = "stop_timeout_ms")]
  pub stop_timeout_ms: u64,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_port() -> u16 {
  9595
}

fn default_true() -> bool {
  true
}

fn default_probe_timeout_ms() -> u64 {
  200
}

fn default_connect_timeout_ms() -> u64 {
  1000
}

fn default_read_timeout_ms() -> u64 {
  1000
}

fn default_retry_delay_ms() -> u64 {
  1000
}

fn default_stop_timeout_ms() -> u64 {
  2000
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      auto_start: true,
      headless: true,
      vlc_path: None,
      vlc_args: Vec::new(),
      probe_timeout_ms: default_probe_timeout_ms(),
      connect_timeout_ms: default_connect_timeout_ms(),
      read_timeout_ms: default_read_timeout_ms(),
      retry_delay_ms: default_retry_delay_ms(),
      stop_timeout_ms: default_stop_timeout_ms(),
    }
  }
}

impl ClientConfig {
  /// Parse a JSON configuration document.
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.host.trim().is_empty() {
      return Err("Host cannot be empty".to_string());
    }
    if self.port == 0 {
      return Err("Port must be between 1 and 65535".to_string());
    }
    let timeouts = [
      ("probeTimeoutMs", self.probe_timeout_ms),
      ("connectTimeoutMs", self.connect_timeout_ms),
      ("readTimeoutMs", self.read_timeout_ms),
    ];
    for (name, value) in timeouts {
      if value == 0 {
        return Err(format!("{} must be greater than zero", name));
      }
    }
    Ok(())
  }

  pub fn target(&self) -> Target {
    Target::new(self.host.clone(), self.port)
  }

  /// Configured VLC executable; empty strings mean auto-detect.
  pub fn vlc_path(&self) -> Option<PathBuf> {
    self
      .vlc_path
      .as_ref()
      .filter(|s| !s.trim().is_empty())
      .map(PathBuf::from)
  }

  pub fn probe_timeout(&self) -> Duration {
    Duration::from_millis(self.probe_timeout_ms)
  }

  pub fn connect_timeout(&self) -> Duration {
    Duration::from_millis(self.connect_timeout_ms)
  }

  pub fn read_timeout(&self) -> Duration {
    Duration::from_millis(self.read_timeout_ms)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }

  pub fn stop_timeout(&self) -> Duration {
    Duration::from_millis(self.stop_timeout_ms)
  }
}

/// Default location of the CLI configuration file.
pub fn default_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|dir| dir.join("vlc-rc").join("config.json"))
}

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vlc_client::{
  default_config_path, ClientConfig, ConnectionError, Reachability, TcpProbe, VlcClient, VlcError,
};

#[derive(Parser, Debug)]
#[command(name = "vlc-rc")]
#[command(about = "Start, stop and talk to VLC through its remote-control interface")]
#[command(version)]
struct Cli {
  /// Increase verbosity (-v debug, -vv trace)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  /// JSON configuration file (defaults to the user config directory)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Host of the RC interface
  #[arg(long, global = true)]
  host: Option<String>,

  /// Port of the RC interface
  #[arg(long, global = true)]
  port: Option<u16>,

  /// Show the VLC window instead of running headless
  #[arg(long, global = true)]
  gui: bool,

  /// VLC executable to launch
  #[arg(long, global = true, value_name = "PATH")]
  vlc_path: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Report whether VLC answers on the RC port
  Status,
  /// Send commands to an already running VLC and print the replies
  Send {
    #[arg(required = true, value_name = "COMMAND")]
    commands: Vec<String>,
  },
  /// Start VLC, forward stdin lines as commands, stop VLC at end of input
  Session,
}

fn init_logging(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
    .format_timestamp_millis()
    .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
  let explicit = cli.config.is_some();
  let path = cli.config.clone().or_else(default_config_path);

  let mut config = match path {
    Some(path) if explicit || path.exists() => read_config(&path)?,
    _ => ClientConfig::default(),
  };

  if let Some(host) = &cli.host {
    config.host = host.clone();
  }
  if let Some(port) = cli.port {
    config.port = port;
  }
  if cli.gui {
    config.headless = false;
  }
  if let Some(vlc_path) = &cli.vlc_path {
    config.vlc_path = Some(vlc_path.clone());
  }
  Ok(config)
}

fn read_config(path: &Path) -> Result<ClientConfig> {
  let json = fs::read_to_string(path)
    .with_context(|| format!("Failed to read config {}", path.display()))?;
  let config = ClientConfig::from_json(&json)
    .with_context(|| format!("Invalid config {}", path.display()))?;
  log::debug!("Loaded config from {}", path.display());
  Ok(config)
}

/// Send one command and print every reply line until VLC goes quiet.
fn run_command(client: &mut VlcClient, command: &str, out: &mut impl Write) -> Result<()> {
  client.write_line(command)?;
  loop {
    match client.read_line() {
      Ok(line) => writeln!(out, "{}", line)?,
      Err(VlcError::Connection(ConnectionError::Timeout)) => return Ok(()),
      Err(e) => return Err(e.into()),
    }
  }
}

fn status(config: &ClientConfig) -> Result<()> {
  let probe = TcpProbe::new(config.target(), config.probe_timeout());
  if probe.is_reachable() {
    println!("running on {}", probe.target());
  } else {
    println!("not running on {}", probe.target());
  }
  Ok(())
}

fn send(config: ClientConfig, commands: &[String]) -> Result<()> {
  let target = config.target();
  let mut client = VlcClient::new(ClientConfig {
    auto_start: false,
    ..config
  })?;
  client
    .connect()
    .with_context(|| format!("Is VLC running with its RC interface on {}?", target))?;

  let stdout = io::stdout();
  let mut out = stdout.lock();
  for command in commands {
    run_command(&mut client, command, &mut out)?;
  }
  client.disconnect();
  Ok(())
}

fn session(config: ClientConfig) -> Result<()> {
  let mut client = VlcClient::new(config).context("Failed to bring up VLC")?;
  if let Some(pid) = client.pid() {
    log::info!("Managing VLC (pid: {})", pid);
  }
  if !client.is_connected() {
    client.connect()?;
  }

  let stdout = io::stdout();
  let mut out = stdout.lock();
  for line in io::stdin().lock().lines() {
    let line = line?;
    let command = line.trim();
    if command.is_empty() {
      continue;
    }
    if let Err(e) = run_command(&mut client, command, &mut out) {
      log::error!("{}", e);
      if !client.is_connected() {
        break;
      }
    }
  }

  if let Some(pid) = client.stop()? {
    log::info!("Stopped VLC (pid: {})", pid);
  }
  Ok(())
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = load_config(&cli)?;
  config.validate().map_err(anyhow::Error::msg)?;

  match cli.command {
    Commands::Status => status(&config),
    Commands::Send { ref commands } => send(config, commands),
    Commands::Session => session(config),
  }
}

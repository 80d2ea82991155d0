//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::ConfigError;
use crate::store::RecolorPolicy;

/// Which updates recolor the last-trade cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Recolor {
    /// Only trade prints
    Trade,
    /// Quote ticks as well as trades
    Tick,
}

impl From<Recolor> for RecolorPolicy {
    fn from(r: Recolor) -> Self {
        match r {
            Recolor::Trade => RecolorPolicy::TradeOnly,
            Recolor::Tick => RecolorPolicy::TickAndTrade,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tickboard", version, about = "Live market-data dashboard")]
pub struct Args {
    /// Stream host
    #[arg(short = 'w', long, default_value = "localhost")]
    pub host: String,

    /// Stream port
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// WebSocket path on the stream host
    #[arg(long, default_value = "/websocket")]
    pub path: String,

    /// Depth snapshot host
    #[arg(long, default_value = "localhost")]
    pub snapshot_host: String,

    /// Depth snapshot port
    #[arg(long, default_value_t = 8081)]
    pub snapshot_port: u16,

    /// Resume offset passed through in the subscription handshake
    #[arg(short, long)]
    pub offset: Option<i64>,

    /// Levels per side requested in a depth snapshot
    #[arg(long, default_value_t = 10)]
    pub max_levels: u16,

    /// Timeout for one snapshot request, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub snapshot_timeout_ms: u64,

    /// Trend recolor policy
    #[arg(long, value_enum, default_value_t = Recolor::Trade)]
    pub recolor: Recolor,

    /// Log file (the terminal belongs to the dashboard)
    #[arg(long, default_value = "client.log")]
    pub log_file: PathBuf,

    /// Increase output verbosity
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated runtime settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub stream_url: String,
    pub snapshot_addr: String,
    pub offset: Option<i64>,
    pub max_levels: u16,
    pub snapshot_timeout: Duration,
    pub recolor: RecolorPolicy,
    pub log_file: PathBuf,
    pub verbose: bool,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        if self.max_levels == 0 {
            return Err(ConfigError::ZeroLevels);
        }
        if self.snapshot_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let path = if self.path.starts_with('/') {
            self.path
        } else {
            format!("/{}", self.path)
        };
        Ok(Config {
            stream_url: format!("ws://{}:{}{}", self.host, self.port, path),
            snapshot_addr: format!("{}:{}", self.snapshot_host, self.snapshot_port),
            offset: self.offset,
            max_levels: self.max_levels,
            snapshot_timeout: Duration::from_millis(self.snapshot_timeout_ms),
            recolor: self.recolor.into(),
            log_file: self.log_file,
            verbose: self.verbose,
        })
    }
}

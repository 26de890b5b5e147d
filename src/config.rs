//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "supertime")]
#[command(about = "A stopwatch and countdown timer with live-activity and widget publishers")]
#[command(version)]
pub struct Config {
    /// Port to bind the control API to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Path of the key-value store shared with the widget
    #[arg(short, long, default_value = "supertime-shared.json")]
    pub store: PathBuf,

    /// In-app refresh rate while the timer runs
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub tick_hz: u32,

    /// Interval of the widget and live-activity publishers, in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub publish_interval_ms: u64,

    /// Sound asset that must exist for the alarm to play
    #[arg(long)]
    pub alarm_sound: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Period of the fast tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz
    }

    /// Period of the external-surface publishers
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }
}

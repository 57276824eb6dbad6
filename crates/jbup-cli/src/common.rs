//! Common types and utilities shared across modules

use clap::Parser;
use jbup_config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "JBUP_LOG";

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long = "config",
        id = "config_file",
        global = true,
        value_name = "PATH",
        help = "Config file to use instead of ~/.config/jbup/jbup.toml"
    )]
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// `--config`, then `JBUP_CONFIG`, then the default location
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::path)
    }
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "jbup=warn,jbup_manifest=warn",
        1 => "jbup=debug,jbup_manifest=debug",
        _ => "jbup=trace,jbup_manifest=trace",
    }
}

/// Install the stderr `tracing` subscriber; `JBUP_LOG` overrides the level
pub fn init_tracing(verbosity: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| default_filter(verbosity).into());

    // A second initialisation only happens in tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

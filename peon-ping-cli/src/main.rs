//! peon-ping setup binary
//!
//! Detects installed agent hosts, downloads the selected sound packs into
//! the shared cache, and registers the notification hooks into each host.

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use peon_ping_core::setup::{self, SetupOptions};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "peon-ping-setup",
    about = "Sets up peon-ping: registers agent hooks, downloads sound packs",
    version
)]
struct Cli {
    /// Install all available packs
    #[clap(long)]
    all: bool,

    /// Install only the named packs (comma-separated)
    #[clap(long, value_delimiter = ',', value_name = "PACK,...")]
    packs: Vec<String>,

    /// Set log level
    #[clap(long, default_value = "warn")]
    log_level: LogLevel,
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let options = SetupOptions {
        all: cli.all,
        packs: cli.packs,
    };

    println!("=== peon-ping setup ===");
    println!();

    match setup::run(&options).await {
        Ok(summary) => {
            print!("{}", summary.render());
            println!();
            println!("=== Setup complete! ===");
            println!();
            println!("Ready to work!");
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

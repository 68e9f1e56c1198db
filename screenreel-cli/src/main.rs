//! ScreenReel CLI
//!
//! Region screen recorder with cursor effects and webcam picture-in-picture.
//!
//! # Usage
//!
//! ```bash
//! # Record the whole primary monitor at 30 fps
//! screenreel record
//!
//! # Record a region with the microphone and a webcam overlay
//! screenreel record --region 100,100,1280,720 --audio microphone --webcam 0
//!
//! # List cameras and audio endpoints
//! screenreel devices
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// ScreenReel - region screen recorder
#[derive(Parser)]
#[command(name = "screenreel")]
#[command(version)]
#[command(about = "Region screen recorder with cursor effects and webcam overlay", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the screen to an MP4 file
    #[command(alias = "rec")]
    Record(commands::RecordArgs),

    /// List webcams and audio endpoints
    Devices,

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("screenreel_core={}", level).parse()?)
                .add_directive(format!("screenreel={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Record(args) => commands::record(args).await?,
        Commands::Devices => commands::devices().await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}

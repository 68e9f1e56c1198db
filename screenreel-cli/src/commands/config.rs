//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use screenreel_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective recording settings
    Show,

    /// Write the sample config file to the default path
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            let settings = ConfigFile::load_from(&path)
                .and_then(|file| file.to_settings())
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;

            if path.exists() {
                println!("Configuration file: {}\n", path.display());
            } else {
                println!("No configuration file at {}, showing defaults\n", path.display());
            }

            println!("  Region:      {}", settings.region);
            println!("  Monitor:     {}", settings.monitor);
            println!("  Resolution:  {}", settings.resolution);
            println!("  Framerate:   {} fps", settings.fps);
            println!("  Audio:       {}", settings.audio);
            println!("  Cursor:      {}", settings.show_cursor);
            println!("  Highlight:   {}", settings.show_highlight);
            if settings.webcam.enabled {
                println!(
                    "  Webcam:      device {} at {} ({:.0}% of height{})",
                    settings.webcam.device_index,
                    settings.webcam.anchor,
                    settings.webcam.height_fraction * 100.0,
                    if settings.webcam.mirror { ", mirrored" } else { "" }
                );
            } else {
                println!("  Webcam:      off");
            }
            println!("  Output:      {}", settings.output_dir.display());
            println!(
                "  Encoder:     {} preset={} crf={}",
                settings.encoder.video_codec, settings.encoder.preset, settings.encoder.crf
            );
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();

            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).context("Failed to create config directory")?;
                }
            }

            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}

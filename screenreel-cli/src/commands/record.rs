//! Record command - capture the screen to an MP4 file

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use screenreel_core::{
    AudioMode, Backends, CaptureRegion, ConfigFile, EngineEvent, EngineState, Point, Recorder,
    RecordingControl, RecordingSettings, Resolution,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::{signal, time};
use tracing::{info, warn};

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Region to capture: "full" or x,y,width,height
    #[arg(short, long)]
    region: Option<CaptureRegion>,

    /// Monitor index
    #[arg(short, long)]
    monitor: Option<usize>,

    /// Output resolution (native, 1080p, 720p, 480p)
    #[arg(short = 's', long)]
    resolution: Option<Resolution>,

    /// Frames per second
    #[arg(short, long)]
    fps: Option<u32>,

    /// Audio source (none, microphone, system)
    #[arg(short, long)]
    audio: Option<AudioMode>,

    /// Webcam device index to overlay
    #[arg(short, long)]
    webcam: Option<usize>,

    /// Webcam overlay position in desktop coordinates: x,y
    #[arg(long, value_parser = parse_point)]
    webcam_pos: Option<Point>,

    /// Webcam overlay height as a fraction of the frame height
    #[arg(long)]
    webcam_size: Option<f64>,

    /// Mirror the webcam horizontally
    #[arg(long)]
    mirror: bool,

    /// Draw the cursor
    #[arg(long, overrides_with = "no_cursor")]
    cursor: bool,

    /// Do not draw the cursor
    #[arg(long)]
    no_cursor: bool,

    /// Draw the click highlight
    #[arg(long, overrides_with = "no_highlight")]
    highlight: bool,

    /// Do not draw the click highlight
    #[arg(long)]
    no_highlight: bool,

    /// Directory for recordings
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Seconds to wait before recording starts
    #[arg(long, default_value = "0")]
    countdown: u32,

    /// Stop after this many seconds of active recording
    #[arg(long)]
    max_duration: Option<u64>,

    /// Configuration file (defaults to the user config path)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RecordArgs {
    /// Layer command line flags over the configuration file
    fn settings(&self) -> Result<RecordingSettings> {
        let file = match &self.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                ConfigFile::load_from(path)?
            }
            None => ConfigFile::load()?,
        };
        let mut settings = file.to_settings().context("Invalid configuration")?;

        if let Some(region) = self.region {
            settings.region = region;
        }
        if let Some(monitor) = self.monitor {
            settings.monitor = monitor;
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(audio) = self.audio {
            settings.audio = audio;
        }
        if let Some(device) = self.webcam {
            settings.webcam.enabled = true;
            settings.webcam.device_index = device;
        }
        if let Some(pos) = self.webcam_pos {
            settings.webcam.anchor = pos;
        }
        if let Some(size) = self.webcam_size {
            settings.webcam.height_fraction = size;
        }
        if self.mirror {
            settings.webcam.mirror = true;
        }
        if self.cursor {
            settings.show_cursor = true;
        } else if self.no_cursor {
            settings.show_cursor = false;
        }
        if self.highlight {
            settings.show_highlight = true;
        } else if self.no_highlight {
            settings.show_highlight = false;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            settings.encoder.ffmpeg_path = Some(ffmpeg.clone());
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid position '{}': expected x,y", s))?;
    let x = x.trim().parse().map_err(|_| format!("Invalid x: {}", x))?;
    let y = y.trim().parse().map_err(|_| format!("Invalid y: {}", y))?;
    Ok(Point::new(x, y))
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Run a recording session until interrupted
pub async fn record(args: RecordArgs) -> Result<()> {
    println!("ScreenReel - Recording\n");

    let settings = args.settings()?;

    println!("Configuration:");
    println!("  Region:      {}", settings.region);
    println!("  Resolution:  {}", settings.resolution);
    println!("  Framerate:   {} fps", settings.fps);
    println!("  Audio:       {}", settings.audio);
    println!("  Output dir:  {}", settings.output_dir.display());
    println!();

    let backends = Backends::native().context("Screen recording is not available")?;
    let recorder = Recorder::spawn(backends).context("Failed to start recording engine")?;
    let mut events = recorder.subscribe_events();

    for remaining in (1..=args.countdown).rev() {
        print!("\rStarting in {}...", remaining);
        std::io::stdout().flush().ok();
        time::sleep(Duration::from_secs(1)).await;
    }
    if args.countdown > 0 {
        println!();
    }

    let session = tokio::task::block_in_place(|| recorder.start(settings))
        .context("Failed to start recording")?;

    println!("Recording to {}", session.output_path.display());
    println!("  Size:   {}x{}", session.width, session.height);
    if let Some(audio) = &session.audio {
        println!("  Audio:  {}", audio);
    }
    if let Some((w, h)) = session.webcam {
        println!("  Webcam: {}x{}", w, h);
    }
    println!();
    println!("Type 'p' + Enter to pause or resume, 'q' + Enter or Ctrl+C to stop.\n");

    let max_duration = args.max_duration.map(Duration::from_secs);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = time::interval(Duration::from_millis(500));
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                println!("\nReceived interrupt signal...");
                break;
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "p" => {
                            let paused = recorder.status().state == EngineState::Paused;
                            tokio::task::block_in_place(|| recorder.set_paused(!paused))?;
                            println!("{}", if paused { "Resumed" } else { "Paused" });
                        }
                        "q" => break,
                        "" => {}
                        other => println!("Unknown command '{}'", other),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(EngineEvent::Failed { error, .. }) => {
                        println!();
                        anyhow::bail!("Recording failed: {}", error);
                    }
                    Ok(EngineEvent::WebcamLost { reason }) => {
                        println!("\nWebcam lost ({}), recording continues without it", reason);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Missed {} engine events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ticker.tick() => {
                let status = recorder.status();
                let marker = if status.state == EngineState::Paused { "PAUSED" } else { "REC" };
                print!("\r{:<6} {}  ({} frames)", marker, format_elapsed(status.active_time), status.frames_written);
                std::io::stdout().flush().ok();

                if let Some(limit) = max_duration {
                    if status.active_time >= limit {
                        println!("\nMaximum duration reached");
                        break;
                    }
                }
            }
        }
    }

    println!("\nStopping recording...");
    let summary = tokio::task::block_in_place(|| recorder.stop())?;

    match summary {
        Some(summary) => {
            info!("Session {} finished", summary.handle);
            println!("Saved {}", summary.output_path.display());
            println!("  Duration: {}", format_elapsed(summary.active_time));
            println!(
                "  Frames:   {} ({} repeated)",
                summary.frames_written, summary.frames_reused
            );
        }
        None => println!("No active recording."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[derive(Parser)]
    struct RecordCli {
        #[command(flatten)]
        args: RecordArgs,
    }

    #[test]
    fn test_webcam_pos_is_a_desktop_anchor() {
        let cli = RecordCli::try_parse_from(["record", "--webcam-pos=-40,25", "--webcam", "1"])
            .unwrap();
        assert_eq!(cli.args.webcam_pos, Some(Point::new(-40, 25)));
        assert_eq!(cli.args.webcam, Some(1));

        let command = RecordCli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "webcam_pos")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("desktop coordinates"), "{}", help);
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10, -20").unwrap(), Point::new(10, -20));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
    }
}

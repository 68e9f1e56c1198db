//! Encoder stderr forwarding
//!
//! Progress lines (`time=` and `bitrate=`) are logged at info at most every
//! five seconds; everything else goes to debug.

use std::io::{BufRead, BufReader, Read};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Whether an encoder output line reports progress
pub fn is_progress_line(line: &str) -> bool {
    line.contains("time=") && line.contains("bitrate=")
}

/// Value following `key` up to the next whitespace, skipping leading spaces
///
/// `extract_value("frame= 12 fps=30", "frame=")` is `Some("12")`.
pub fn extract_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    let value = line[start..].trim_start();
    let end = value.find(char::is_whitespace).unwrap_or(value.len());
    Some(&value[..end])
}

/// Drain `stderr` on a helper thread until the encoder closes it
pub(crate) fn spawn_stderr_monitor<R>(stderr: R, label: String) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    std::thread::Builder::new()
        .name("screenreel-encoder-log".to_string())
        .spawn(move || {
            let mut last_progress: Option<Instant> = None;
            // ffmpeg terminates progress updates with '\r'
            for chunk in BufReader::new(stderr).split(b'\n') {
                let Ok(chunk) = chunk else { break };
                let text = String::from_utf8_lossy(&chunk);
                for line in text.split('\r').map(str::trim).filter(|l| !l.is_empty()) {
                    if is_progress_line(line) {
                        let due = last_progress
                            .map(|t| t.elapsed() >= PROGRESS_LOG_INTERVAL)
                            .unwrap_or(true);
                        if due {
                            info!(
                                "{} | time {} | bitrate {} | speed {}",
                                label,
                                extract_value(line, "time=").unwrap_or("??"),
                                extract_value(line, "bitrate=").unwrap_or("N/A"),
                                extract_value(line, "speed=").unwrap_or("??"),
                            );
                            last_progress = Some(Instant::now());
                        }
                    } else {
                        debug!("ffmpeg: {}", line);
                    }
                }
            }
            debug!("{} stderr closed", label);
        })
}

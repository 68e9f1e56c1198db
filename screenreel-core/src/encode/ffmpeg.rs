//! ffmpeg subprocess sink
//!
//! Frames go to ffmpeg's stdin as raw BGRA. The audio device, if any, is
//! opened by ffmpeg itself.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::monitor::spawn_stderr_monitor;
use super::{EncoderParams, EncoderSink};
use crate::error::{ReelError, Result};
use crate::types::AudioFlow;

/// How long `finish` waits for ffmpeg to exit before killing it
pub const FINISH_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

const FFMPEG_BINARY: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// Locate the ffmpeg binary
///
/// Order: the configured path, next to the running executable, then `PATH`.
pub fn find_ffmpeg(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }

    if let Some(local) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(FFMPEG_BINARY)))
        .filter(|path| path.exists())
    {
        return local;
    }

    PathBuf::from(FFMPEG_BINARY)
}

/// Command line for one encode, without the program name
pub fn build_ffmpeg_args(params: &EncoderParams) -> Vec<String> {
    let mut args: Vec<String> = [
        "-loglevel",
        "warning",
        "-thread_queue_size",
        "2048",
        "-f",
        "rawvideo",
        "-pixel_format",
        "bgra",
        "-video_size",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{}x{}", params.width, params.height));
    args.push("-framerate".into());
    args.push(params.fps.to_string());
    args.push("-i".into());
    args.push("-".into());

    if let Some(audio) = &params.audio {
        let format = match audio.flow {
            AudioFlow::Capture => "dshow",
            AudioFlow::Render => "wasapi",
        };
        args.extend([
            "-thread_queue_size".to_string(),
            "2048".to_string(),
            "-f".to_string(),
            format.to_string(),
            "-i".to_string(),
            format!("audio={}", audio.device_name),
        ]);
    }

    args.push("-vf".into());
    args.push(match &params.scale {
        Some(scale) => scale.filter(),
        None => "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
    });

    let opts = &params.options;
    args.extend([
        "-c:v".to_string(),
        opts.video_codec.clone(),
        "-preset".to_string(),
        opts.preset.clone(),
        "-crf".to_string(),
        opts.crf.to_string(),
    ]);
    if params.audio.is_some() {
        args.extend([
            "-c:a".to_string(),
            opts.audio_codec.clone(),
            "-b:a".to_string(),
            format!("{}k", opts.audio_bitrate),
        ]);
    }
    args.extend([
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-shortest".to_string(),
        "-y".to_string(),
        params.output_path.to_string_lossy().into_owned(),
    ]);

    args
}

/// Encoder sink backed by an ffmpeg child process
#[derive(Default)]
pub struct FfmpegSink {
    program: Option<PathBuf>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_thread: Option<JoinHandle<()>>,
    frame_len: usize,
    frames_written: u64,
    output_path: Option<PathBuf>,
}

impl FfmpegSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always run `program` instead of searching for ffmpeg
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        let mut sink = Self::default();
        sink.program = Some(program.into());
        sink
    }

    /// Frames written in the current (or last) encode
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Output file of the current (or last) encode
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to poll ffmpeg: {}", e);
                    return None;
                }
            }
        }
    }
}

impl EncoderSink for FfmpegSink {
    fn start(&mut self, params: &EncoderParams) -> Result<()> {
        if self.is_running() {
            return Err(ReelError::encoder_start("Encoder is already running"));
        }
        if params.width == 0 || params.height == 0 || params.fps == 0 {
            return Err(ReelError::encoder_start(format!(
                "Invalid stream parameters {}x{} @ {}fps",
                params.width, params.height, params.fps
            )));
        }

        let program = self
            .program
            .clone()
            .unwrap_or_else(|| find_ffmpeg(params.options.ffmpeg_path.as_deref()));
        let args = build_ffmpeg_args(params);
        info!("Starting ffmpeg: {} {}", program.display(), args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ReelError::SpawnFailed(format!("{}: {}", program.display(), e)))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::SpawnFailed("ffmpeg stdin was not piped".to_string()));
        };

        self.stderr_thread = match child.stderr.take() {
            Some(stderr) => match spawn_stderr_monitor(stderr, "encoder".to_string()) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Failed to start ffmpeg log thread: {}", e);
                    None
                }
            },
            None => None,
        };

        debug!("ffmpeg started (pid {})", child.id());
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.frame_len = params.frame_len();
        self.frames_written = 0;
        self.output_path = Some(params.output_path.clone());
        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ReelError::sink_closed("Encoder is not running"))?;

        if data.len() != self.frame_len {
            return Err(ReelError::FrameSizeMismatch {
                expected: self.frame_len,
                actual: data.len(),
            });
        }

        stdin.write_all(data).map_err(|e| {
            ReelError::sink_closed(format!(
                "write failed after {} frames: {}",
                self.frames_written, e
            ))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Closing stdin is ffmpeg's end-of-stream
        drop(self.stdin.take());

        match Self::wait_with_timeout(&mut child, FINISH_TIMEOUT) {
            Some(status) if status.success() => {
                info!("ffmpeg finished after {} frames", self.frames_written);
            }
            Some(status) => {
                warn!("ffmpeg exited with {}", status);
            }
            None => {
                error!(
                    "ffmpeg did not exit within {}s, killing it",
                    FINISH_TIMEOUT.as_secs()
                );
                let _ = child.kill();
                let _ = child.wait();
            }
        }

        if let Some(thread) = self.stderr_thread.take() {
            let _ = thread.join();
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

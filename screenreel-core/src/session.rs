//! Recording session bookkeeping
//!
//! A `RecordingSession` exists only while the engine is Recording or Paused.
//! It owns the pacing schedule and the pause accounting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::config::RecordingSettings;
use crate::types::Handle;

/// One recording, from start to stop
#[derive(Debug, Clone)]
pub struct RecordingSession {
    handle: Handle,
    started_at: Instant,
    schedule_origin: Instant,
    frame_index: u64,
    paused_at: Option<Instant>,
    total_paused: Duration,
    output_path: PathBuf,
    settings: RecordingSettings,
    width: u32,
    height: u32,
    frames_written: u64,
    frames_reused: u64,
}

impl RecordingSession {
    pub fn new(
        settings: RecordingSettings,
        output_path: PathBuf,
        width: u32,
        height: u32,
        now: Instant,
    ) -> Self {
        Self {
            handle: Handle::new(),
            started_at: now,
            schedule_origin: now,
            frame_index: 0,
            paused_at: None,
            total_paused: Duration::ZERO,
            output_path,
            settings,
            width,
            height,
            frames_written: 0,
            frames_reused: 0,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    /// Dimensions of every frame handed to the encoder
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frames_reused(&self) -> u64 {
        self.frames_reused
    }

    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Deadline of the next output slot: `origin + interval * (index + 1)`
    pub fn next_deadline(&self) -> Instant {
        let interval = self.settings.frame_interval();
        let nanos = interval.as_nanos() * (u128::from(self.frame_index) + 1);
        self.schedule_origin + Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Record one written slot
    pub fn record_frame(&mut self, reused: bool) {
        self.frame_index += 1;
        self.frames_written += 1;
        if reused {
            self.frames_reused += 1;
        }
    }

    /// Enter the paused state. Returns false if already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Leave the paused state, returning the paused span.
    ///
    /// The schedule origin moves forward by the same span so no slots are
    /// owed for the time spent paused.
    pub fn resume(&mut self, now: Instant) -> Option<Duration> {
        let paused_at = self.paused_at.take()?;
        let span = now.saturating_duration_since(paused_at);
        self.total_paused += span;
        self.schedule_origin += span;
        Some(span)
    }

    /// `now - start - total_paused`, frozen at the pause instant while paused
    pub fn active_time(&self, now: Instant) -> Duration {
        let now = match self.paused_at {
            Some(paused_at) => paused_at.min(now),
            None => now,
        };
        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.total_paused)
    }

    /// Final figures for a session that has ended at `now`
    pub fn summary(&self, now: Instant) -> SessionSummary {
        SessionSummary {
            handle: self.handle,
            output_path: self.output_path.clone(),
            frames_written: self.frames_written,
            frames_reused: self.frames_reused,
            active_time: self.active_time(now),
            width: self.width,
            height: self.height,
        }
    }
}

/// What a finished session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub handle: Handle,
    pub output_path: PathBuf,
    pub frames_written: u64,
    pub frames_reused: u64,
    pub active_time: Duration,
    pub width: u32,
    pub height: u32,
}

/// Timestamped output path inside `dir`
///
/// `recording_YYYYMMDD_HHMMSS.mp4`; a `_N` suffix is appended when a file
/// with that name already exists.
pub fn output_path_for(dir: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let stem = timestamp.format("recording_%Y%m%d_%H%M%S").to_string();
    let candidate = dir.join(format!("{}.mp4", stem));
    if !candidate.exists() {
        return candidate;
    }

    (1u32..)
        .map(|n| dir.join(format!("{}_{}.mp4", stem, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

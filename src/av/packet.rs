use bytes::Bytes;
use std::time::Duration;

use crate::format::ps::{pts_to_time, time_to_pts, ClockReference};

/// One access unit handed to the muxer, with its timing.
///
/// Timestamps and duration are 90 kHz ticks.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Length-prefixed NAL units for video, raw frames for audio.
    pub data: Bytes,
    /// Selects the video elementary stream; audio otherwise.
    pub is_video: bool,
    /// The sample can be decoded on its own.
    pub is_key: bool,
    /// Presentation timestamp.
    pub pts: u64,
    /// Decoding timestamp.
    pub dts: u64,
    /// System clock reference written into the pack header.
    pub scr: ClockReference,
    /// Nominal duration, used to derive the mux rate.
    pub duration: u64,
}

impl Sample {
    fn new(data: impl Into<Bytes>, is_video: bool) -> Self {
        Self {
            data: data.into(),
            is_video,
            is_key: false,
            pts: 0,
            dts: 0,
            scr: ClockReference::default(),
            duration: 0,
        }
    }

    /// A video sample holding length-prefixed NAL units.
    pub fn video(data: impl Into<Bytes>) -> Self {
        Self::new(data, true)
    }

    /// An audio sample, carried verbatim.
    pub fn audio(data: impl Into<Bytes>) -> Self {
        Self::new(data, false)
    }

    /// Marks the sample as decodable on its own.
    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    /// Sets both presentation and decoding time.
    pub fn with_timestamps(mut self, pts: u64, dts: u64) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Sets both timestamps from media times, rounded down to 90 kHz ticks.
    pub fn with_times(self, pts: Duration, dts: Duration) -> Self {
        self.with_timestamps(time_to_pts(pts), time_to_pts(dts))
    }

    /// Presentation timestamp as a media time.
    pub fn presentation_time(&self) -> Duration {
        pts_to_time(self.pts)
    }

    /// Sets the system clock reference for the pack header.
    pub fn with_scr(mut self, scr: impl Into<ClockReference>) -> Self {
        self.scr = scr.into();
        self
    }

    /// Sets the nominal duration in 90 kHz ticks.
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }
}

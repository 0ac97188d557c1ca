//! Codec-level helpers used by the program stream muxer.

/// H.264/AVC NAL unit inspection
pub mod h264;

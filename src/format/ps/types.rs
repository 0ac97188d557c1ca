use std::time::Duration;

// Start codes
/// Opens every pack.
pub const PACK_START_CODE: u32 = 0x0000_01BA;
/// Opens the system header.
pub const SYSTEM_HEADER_START_CODE: u32 = 0x0000_01BB;
/// Opens the program stream map (stream id 0xBC).
pub const PROGRAM_STREAM_MAP_START_CODE: u32 = 0x0000_01BC;
/// Terminates a program stream.
pub const PROGRAM_END_CODE: u32 = 0x0000_01B9;
/// packet_start_code_prefix shared by all PES packets.
pub const PES_START_CODE_PREFIX: u32 = 0x00_0001;

/// Annex B start code written in front of every NAL unit.
pub const NAL_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

// Stream IDs
/// program_stream_map stream id.
pub const STREAM_ID_PROGRAM_STREAM_MAP: u8 = 0xbc;
/// First MPEG video stream id.
pub const STREAM_ID_VIDEO: u8 = 0xe0;
/// First MPEG audio stream id.
pub const STREAM_ID_AUDIO: u8 = 0xc0;

// Elementary Stream Types
/// H.264 video (ISO/IEC 14496-10).
pub const STREAM_TYPE_H264: u8 = 0x1b;
/// AAC audio with ADTS framing.
pub const STREAM_TYPE_AAC: u8 = 0x0f;

// Descriptors
/// descriptor_tag of data_stream_alignment_descriptor.
pub const DATA_STREAM_ALIGNMENT_DESCRIPTOR: u8 = 0x06;
/// Video alignment: access unit.
pub const VIDEO_ALIGNMENT_TYPE: u8 = 0x03;
/// Audio alignment: sync word.
pub const AUDIO_ALIGNMENT_TYPE: u8 = 0x01;

// Field limits
/// Timestamp clock rate.
pub const PTS_HZ: u64 = 90_000;
/// Largest 33-bit PTS, DTS or SCR base.
pub const MAX_TIMESTAMP: u64 = (1 << 33) - 1;
/// Largest SCR extension; 300 ticks roll into the base.
pub const MAX_SCR_EXTENSION: u16 = 299;
/// Largest 22-bit program_mux_rate.
pub const MAX_MUX_RATE: u32 = (1 << 22) - 1;
/// program_mux_rate is expressed in units of 50 bytes/second.
pub const MUX_RATE_UNIT: u64 = 50;
/// Largest PES_packet_length.
pub const MAX_PES_PACKET_LENGTH: usize = 0xFFFF;

/// Converts a media time to 90 kHz ticks.
pub fn time_to_pts(time: Duration) -> u64 {
    (time.as_nanos() * PTS_HZ as u128 / 1_000_000_000) as u64
}

/// Converts 90 kHz ticks to a media time.
pub fn pts_to_time(pts: u64) -> Duration {
    Duration::from_nanos((pts as u128 * 1_000_000_000 / PTS_HZ as u128) as u64)
}

//! # MPEG-2 Program Stream (PS) Multiplexing
//!
//! Turns length-prefixed H.264 access units (and opaque audio frames) into
//! self-contained program stream chunks:
//!
//! - **Normalization**: access unit delimiter and parameter set injection,
//!   length prefix to start code conversion
//! - **PES**: packetization with PTS/DTS and data alignment
//! - **Pack headers**: SCR and a mux rate derived from each chunk's size
//! - **System header / program stream map**: emitted ahead of key samples
//!
//! Each chunk stands on its own; concatenating chunks yields a valid stream
//! that [`ProgramStreamWriter`] closes with a program end code.
//!
//! ## Example Usage
//!
//! ```rust
//! use bytes::BytesMut;
//! use psmux::av::Sample;
//! use psmux::config::MuxerConfig;
//! use psmux::format::ps::ProgramStreamMuxer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = MuxerConfig::new();
//! config.set_sps_pps(vec![0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68]);
//! let muxer = ProgramStreamMuxer::new(config);
//!
//! let sample = Sample::video(vec![0x00, 0x00, 0x00, 0x03, 0x25, 0xb8, 0x20])
//!     .with_key_flag(true)
//!     .with_timestamps(18000, 18000)
//!     .with_duration(3000);
//!
//! let mut out = BytesMut::new();
//! let written = muxer.process_sample(&sample, &mut out)?;
//! assert_eq!(written, out.len());
//! assert_eq!(&out[..4], &[0x00, 0x00, 0x01, 0xba]);
//! # Ok(())
//! # }
//! ```

/// Program stream muxer tying normalization and headers together
pub mod muxer;
/// Access unit normalization
pub mod normalizer;
/// Pack header and system clock reference
pub mod pack;
/// PES packetization
pub mod pes;
/// System header and program stream map
pub mod system;
/// Start codes, stream ids and field limits
pub mod types;
/// Async sink adapter
pub mod writer;

pub use muxer::{ProgramStreamMuxer, SharedMuxer};
pub use normalizer::{access_unit_delimiter, convert_length_to_start_code, inject_required_units};
pub use pack::{compute_mux_rate, ClockReference, PackHeader, PACK_HEADER_SIZE};
pub use pes::{PESHeader, PESPacket};
pub use system::{write_system_header_and_map, ProgramStreamMap, SystemHeader};
pub use types::*;
pub use writer::ProgramStreamWriter;

#![doc(html_root_url = "https://docs.rs/psmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # psmux - MPEG-2 Program Stream Muxer
//!
//! `psmux` packages H.264 access units, as stored in MP4/DASH samples with
//! length-prefixed NAL units, into MPEG-2 Program Stream chunks.
//!
//! ## Features
//!
//! - Access unit normalization: delimiter and SPS/PPS injection, Annex B
//!   start code conversion for 1 to 8 byte length prefixes
//! - PES packetization with PTS/DTS
//! - Pack headers with SCR and a per-chunk mux rate
//! - System header and program stream map ahead of key samples
//! - Async sink adapter built on tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use psmux::av::{Muxer, Sample};
//! use psmux::config::MuxerConfig;
//! use psmux::format::ps::ProgramStreamWriter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = MuxerConfig::from_env()?;
//!     config.set_avc_decoder_configuration(&std::fs::read("avcC.bin")?)?;
//!
//!     let file = tokio::fs::File::create("out.mpg").await?;
//!     let mut writer = ProgramStreamWriter::new(file, config);
//!
//!     let sample = Sample::video(std::fs::read("frame0.h264")?)
//!         .with_key_flag(true)
//!         .with_duration(3000);
//!     writer.write_sample(&sample).await?;
//!     writer.write_trailer().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: samples and the async muxer trait
//! - `codec`: H.264 NAL unit walking and classification
//! - `format`: program stream headers, PES and the muxer itself
//! - `config`: session configuration
//! - `error`: error type and result alias
//! - `utils`: bit reader/writer and MPEG-2 CRC32

/// Samples and the muxer trait
pub mod av;

/// H.264 access unit inspection
pub mod codec;

/// Error types and utilities
pub mod error;

/// Container format implementations
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{MuxError, Result};

//! # Utility Functions and Types
//!
//! Bit-level reading and writing plus the MPEG-2 CRC32 used by the
//! Program Stream Map.
//!
//! ```rust
//! use psmux::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3)?;
//! writer.write_reserved(5);
//! let bytes = writer.into_bytes()?;
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_bits(3)?, 0b101);
//! # Ok(())
//! # }
//! ```

/// Bit-level reader and writer
pub mod bits;

/// CRC calculation implementations
pub mod crc;

pub use bits::{BitReader, BitWriter};
pub use crc::Crc32Mpeg2;

use bytes::{BufMut, BytesMut};

use super::types::*;
use crate::error::{MuxError, Result};
use crate::utils::BitWriter;

/// Size of a pack header without stuffing bytes.
pub const PACK_HEADER_SIZE: usize = 14;

/// Largest pack_stuffing_length (3-bit field).
pub const MAX_PACK_STUFFING: u8 = 7;

/// System clock reference: a 33-bit 90 kHz base plus a 27 MHz extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct ClockReference {
    /// 90 kHz part (33 bits).
    pub base: u64,
    /// 27 MHz remainder, 0..=299.
    pub extension: u16,
}

impl ClockReference {
    /// Creates a clock reference from its two parts.
    pub fn new(base: u64, extension: u16) -> Self {
        Self { base, extension }
    }

    /// Splits a 27 MHz tick count into base and extension.
    pub fn from_27mhz(ticks: u64) -> Self {
        Self {
            base: ticks / 300,
            extension: (ticks % 300) as u16,
        }
    }

    /// Total value in 27 MHz ticks.
    pub fn as_27mhz(&self) -> u64 {
        self.base * 300 + self.extension as u64
    }

    /// Checks both parts fit their fields.
    pub fn validate(&self) -> Result<()> {
        if self.base > MAX_TIMESTAMP {
            return Err(MuxError::Range(format!(
                "system clock reference base {} exceeds 33 bits",
                self.base
            )));
        }
        if self.extension > MAX_SCR_EXTENSION {
            return Err(MuxError::Range(format!(
                "system clock reference extension {} exceeds {}",
                self.extension, MAX_SCR_EXTENSION
            )));
        }
        Ok(())
    }
}

impl From<u64> for ClockReference {
    /// Treats the value as 90 kHz ticks with no extension.
    fn from(base: u64) -> Self {
        Self::new(base, 0)
    }
}

/// MPEG-2 program stream pack header (ISO/IEC 13818-1 2.5.3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    /// System clock reference.
    pub scr: ClockReference,
    /// program_mux_rate in units of 50 bytes/second (22 bits).
    pub mux_rate: u32,
    /// Number of 0xFF bytes following the header (0..=7).
    pub stuffing_length: u8,
}

impl PackHeader {
    /// Creates a header without stuffing.
    pub fn new(scr: impl Into<ClockReference>, mux_rate: u32) -> Self {
        Self {
            scr: scr.into(),
            mux_rate,
            stuffing_length: 0,
        }
    }

    /// Sets the number of stuffing bytes.
    pub fn with_stuffing(mut self, stuffing_length: u8) -> Self {
        self.stuffing_length = stuffing_length;
        self
    }

    /// Fixed size of the header fields, excluding stuffing.
    pub const fn header_size() -> usize {
        PACK_HEADER_SIZE
    }

    /// Serialized size including stuffing.
    pub fn len(&self) -> usize {
        PACK_HEADER_SIZE + self.stuffing_length as usize
    }

    /// Always false; a pack header has fixed fields.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Appends the header to `buf`.
    ///
    /// Values that overflow their fields fail with [`MuxError::Range`]
    /// before anything is appended.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        self.scr.validate()?;
        if self.mux_rate > MAX_MUX_RATE {
            return Err(MuxError::Range(format!(
                "program mux rate {} exceeds 22 bits",
                self.mux_rate
            )));
        }
        if self.stuffing_length > MAX_PACK_STUFFING {
            return Err(MuxError::Range(format!(
                "pack stuffing length {} exceeds {}",
                self.stuffing_length, MAX_PACK_STUFFING
            )));
        }

        let base = self.scr.base;
        let mut bits = BitWriter::with_capacity(PACK_HEADER_SIZE);
        bits.write_bits(PACK_START_CODE as u64, 32)?;
        bits.write_bits(0b01, 2)?;
        bits.write_bits(base >> 30, 3)?;
        bits.write_marker();
        bits.write_bits((base >> 15) & 0x7FFF, 15)?;
        bits.write_marker();
        bits.write_bits(base & 0x7FFF, 15)?;
        bits.write_marker();
        bits.write_bits(self.scr.extension as u64, 9)?;
        bits.write_marker();
        bits.write_bits(self.mux_rate as u64, 22)?;
        bits.write_marker();
        bits.write_marker();
        bits.write_reserved(5);
        bits.write_bits(self.stuffing_length as u64, 3)?;

        buf.extend_from_slice(&bits.into_bytes()?);
        for _ in 0..self.stuffing_length {
            buf.put_u8(0xFF);
        }
        Ok(())
    }
}

/// Mux rate covering `chunk_len` bytes delivered over `duration` 90 kHz ticks.
///
/// Rounds down; a zero rate is raised to 1 since the field forbids 0.
pub fn compute_mux_rate(chunk_len: usize, duration: u64) -> Result<u32> {
    if duration == 0 {
        return Err(MuxError::Range(
            "sample duration must be non-zero to derive a mux rate".into(),
        ));
    }

    let rate = chunk_len as u128 * PTS_HZ as u128 / (duration as u128 * MUX_RATE_UNIT as u128);
    if rate > MAX_MUX_RATE as u128 {
        return Err(MuxError::Range(format!(
            "{} bytes over {} ticks needs mux rate {}, above 22 bits",
            chunk_len, duration, rate
        )));
    }
    Ok((rate as u32).max(1))
}

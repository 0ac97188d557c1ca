use crate::error::{MuxError, Result};
use bitvec::prelude::*;

/// A bit-level reader over H.264 RBSP data.
///
/// Used to pull the leading exp-Golomb fields out of slice headers.
///
/// Example:
/// ```
/// use psmux::utils::BitReader;
///
/// // first_mb_in_slice = 0 ("1"), slice_type = 2 ("011")
/// let data = [0b1011_0000];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_golomb().unwrap(), 0);
/// assert_eq!(reader.read_golomb().unwrap(), 2);
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit, returning true for 1.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.byte_offset >= self.data.len() {
            return Err(MuxError::Bitstream("reached end of data".into()));
        }

        let bit = (self.data[self.byte_offset] >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;

        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit == 1)
    }

    /// Reads n bits as a big-endian number. n must be at most 32.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(MuxError::Bitstream(format!("cannot read {} bits at once", n)));
        }

        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Ok(value)
    }

    /// Reads an unsigned exponential Golomb code, ue(v).
    ///
    /// M leading zeros, a 1, then M info bits: value = 2^M + info - 1.
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(MuxError::Bitstream("invalid exp-Golomb code".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits(leading_zeros)?;
        Ok((1u32 << leading_zeros) + info - 1)
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        (self.data.len() - self.byte_offset) * 8 - self.bit_offset as usize
    }
}

/// Accumulates big-endian bit fields and flushes them as bytes.
///
/// Header layouts in MPEG-2 systems interleave value fields with fixed
/// marker bits; writing them field by field keeps each layout readable
/// next to the syntax tables it implements.
///
/// ```
/// use psmux::utils::BitWriter;
///
/// let mut writer = BitWriter::new();
/// writer.write_bits(0b01, 2).unwrap();
/// writer.write_marker();
/// writer.write_bits(0b10101, 5).unwrap();
/// assert_eq!(writer.into_bytes().unwrap(), vec![0b0111_0101]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self {
            bits: BitVec::new(),
        }
    }

    /// Creates an empty writer with room for `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(bytes * 8),
        }
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Appends the low `n` bits of `value`, most significant first.
    ///
    /// Fails with [`MuxError::Range`] if `value` needs more than `n` bits.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        if n > 64 {
            return Err(MuxError::Range(format!("bit field of {} bits", n)));
        }
        if n < 64 && value >> n != 0 {
            return Err(MuxError::Range(format!(
                "{:#x} does not fit in {} bits",
                value, n
            )));
        }

        let start = 64 - n as usize;
        self.bits
            .extend_from_bitslice(&value.view_bits::<Msb0>()[start..]);
        Ok(())
    }

    /// Appends a marker bit (always 1).
    pub fn write_marker(&mut self) {
        self.write_bit(true);
    }

    /// Appends `n` reserved bits, all set to 1.
    pub fn write_reserved(&mut self, n: u32) {
        for _ in 0..n {
            self.write_bit(true);
        }
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the written bits end on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bits.len() % 8 == 0
    }

    /// Returns the written bytes. Fails unless the writer is byte aligned.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if !self.is_byte_aligned() {
            return Err(MuxError::Bitstream(format!(
                "{} bits written, not a whole number of bytes",
                self.bits.len()
            )));
        }
        Ok(self.bits.into_vec())
    }
}

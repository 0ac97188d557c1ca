use bytes::{BufMut, Bytes, BytesMut};

use super::types::{NALUnitType, NalSummary, PicType};
use crate::error::{MuxError, Result};
use crate::utils::BitReader;

/// Bytes of slice header inspected when looking for `slice_type`.
const SLICE_HEADER_PEEK: usize = 16;

/// Reads a big-endian NAL length prefix of `width` bytes.
pub fn read_length_prefix(bytes: &[u8], width: usize) -> usize {
    bytes
        .iter()
        .take(width)
        .fold(0usize, |acc, &b| (acc << 8) | b as usize)
}

/// Appends `value` as a big-endian length prefix of `width` bytes.
///
/// Fails with [`MuxError::Range`] if the value does not fit.
pub fn put_length_prefix(buf: &mut BytesMut, value: usize, width: usize) -> Result<()> {
    if width < 8 && (value as u64) >> (width * 8) != 0 {
        return Err(MuxError::Range(format!(
            "NAL unit of {} bytes does not fit a {}-byte length prefix",
            value, width
        )));
    }
    for shift in (0..width).rev() {
        buf.put_u8((value as u64 >> (shift * 8)) as u8);
    }
    Ok(())
}

/// Iterator over the NAL units of a length-prefixed buffer.
///
/// Yields each NAL unit without its prefix. A prefix or unit that runs past
/// the end of the buffer yields [`MuxError::MalformedStream`] and ends the
/// iteration.
pub struct LengthPrefixedNalus<'a> {
    data: &'a [u8],
    nalu_length: usize,
    offset: usize,
    failed: bool,
}

impl<'a> LengthPrefixedNalus<'a> {
    /// Walks `data` using prefixes of `nalu_length` bytes.
    pub fn new(data: &'a [u8], nalu_length: usize) -> Self {
        Self {
            data,
            nalu_length,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for LengthPrefixedNalus<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let remaining = self.data.len() - self.offset;
        if self.nalu_length == 0 || remaining < self.nalu_length {
            self.failed = true;
            return Some(Err(MuxError::MalformedStream(format!(
                "truncated length prefix at offset {}",
                self.offset
            ))));
        }

        let size = read_length_prefix(&self.data[self.offset..], self.nalu_length);
        let start = self.offset + self.nalu_length;
        if size > self.data.len() - start {
            self.failed = true;
            return Some(Err(MuxError::MalformedStream(format!(
                "NAL unit at offset {} declares {} bytes, {} remain",
                self.offset,
                size,
                self.data.len() - start
            ))));
        }

        self.offset = start + size;
        Some(Ok(&self.data[start..start + size]))
    }
}

/// Removes emulation prevention bytes (`00 00 03` becomes `00 00`).
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        out.push(byte);
    }

    out
}

/// Inspects a length-prefixed access unit without modifying it.
///
/// This is the seam through which the muxer learns the picture type and
/// whether a delimiter or parameter sets are already present.
pub trait NalClassifier {
    /// Classifies `data`, whose NAL units carry `nalu_length`-byte prefixes.
    fn classify(&self, data: &[u8], nalu_length: usize) -> Result<NalSummary>;
}

/// Classifier for H.264 access units.
#[derive(Debug, Default, Clone, Copy)]
pub struct H264Classifier;

impl H264Classifier {
    /// Creates a classifier.
    pub fn new() -> Self {
        Self
    }

    fn slice_pic_type(nalu: &[u8]) -> PicType {
        let nal_type = NALUnitType::from(nalu[0]);
        let end = nalu.len().min(1 + SLICE_HEADER_PEEK);
        let rbsp = remove_emulation_prevention(&nalu[1..end]);
        let mut reader = BitReader::new(&rbsp);

        let slice_type = reader
            .read_golomb()
            .and_then(|_first_mb_in_slice| reader.read_golomb());

        match slice_type {
            Ok(slice_type) => PicType::from_slice_type(slice_type),
            Err(_) if nal_type == NALUnitType::CodedSliceIDR => PicType::I,
            Err(_) => PicType::Unknown,
        }
    }
}

impl NalClassifier for H264Classifier {
    fn classify(&self, data: &[u8], nalu_length: usize) -> Result<NalSummary> {
        let mut summary = NalSummary::default();
        let mut found_slice = false;

        for nalu in LengthPrefixedNalus::new(data, nalu_length) {
            let nalu = nalu?;
            let Some(&header) = nalu.first() else {
                continue;
            };

            let nal_type = NALUnitType::from(header);
            if nal_type == NALUnitType::AccessUnitDelimiter {
                summary.has_aud = true;
            } else if nal_type.is_parameter_set() {
                summary.has_parameter_sets = true;
            } else if nal_type.has_slice_header() && !found_slice {
                summary.pic_type = Self::slice_pic_type(nalu);
                found_slice = summary.pic_type != PicType::Unknown;
            }
        }

        Ok(summary)
    }
}

/// Contents of an `AVCDecoderConfigurationRecord` (ISO/IEC 14496-15 `avcC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfiguration {
    /// AVCProfileIndication.
    pub profile_idc: u8,
    /// AVCLevelIndication.
    pub level_idc: u8,
    /// Width of the NAL length prefixes used by samples (lengthSizeMinusOne + 1).
    pub nalu_length: usize,
    /// Sequence parameter sets, without prefixes.
    pub sps: Vec<Bytes>,
    /// Picture parameter sets, without prefixes.
    pub pps: Vec<Bytes>,
}

impl AvcDecoderConfiguration {
    /// Parses an `avcC` box payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 7 {
            return Err(MuxError::MalformedStream(
                "avcC record shorter than its fixed fields".into(),
            ));
        }
        if data[0] != 1 {
            return Err(MuxError::MalformedStream(format!(
                "unsupported avcC configuration version {}",
                data[0]
            )));
        }

        let profile_idc = data[1];
        let level_idc = data[3];
        let nalu_length = (data[4] & 0x03) as usize + 1;

        let mut offset = 5;
        let sps_count = (data[offset] & 0x1F) as usize;
        offset += 1;
        let sps = Self::read_parameter_sets(data, &mut offset, sps_count)?;

        let pps_count = *data.get(offset).ok_or_else(|| {
            MuxError::MalformedStream("avcC record ends before PPS count".into())
        })? as usize;
        offset += 1;
        let pps = Self::read_parameter_sets(data, &mut offset, pps_count)?;

        Ok(Self {
            profile_idc,
            level_idc,
            nalu_length,
            sps,
            pps,
        })
    }

    fn read_parameter_sets(data: &[u8], offset: &mut usize, count: usize) -> Result<Vec<Bytes>> {
        let mut sets = Vec::with_capacity(count);
        for _ in 0..count {
            if data.len() < *offset + 2 {
                return Err(MuxError::MalformedStream(
                    "avcC parameter set length truncated".into(),
                ));
            }
            let size = read_length_prefix(&data[*offset..], 2);
            *offset += 2;
            if data.len() < *offset + size {
                return Err(MuxError::MalformedStream(format!(
                    "avcC parameter set declares {} bytes, {} remain",
                    size,
                    data.len() - *offset
                )));
            }
            sets.push(Bytes::copy_from_slice(&data[*offset..*offset + size]));
            *offset += size;
        }
        Ok(sets)
    }

    /// SPS then PPS units, each behind a `nalu_length`-byte prefix.
    pub fn length_prefixed_parameter_sets(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        for set in self.sps.iter().chain(self.pps.iter()) {
            put_length_prefix(&mut buf, set.len(), self.nalu_length)?;
            buf.extend_from_slice(set);
        }
        Ok(buf.to_vec())
    }
}

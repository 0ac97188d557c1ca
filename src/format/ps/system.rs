use bytes::{BufMut, Bytes, BytesMut};

use super::types::*;
use crate::error::{MuxError, Result};
use crate::utils::{BitWriter, Crc32Mpeg2};

/// P-STD buffer bound of one stream in the system header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBound {
    /// Stream the bound applies to.
    pub stream_id: u8,
    /// P-STD_buffer_bound_scale: false for 128-byte units, true for 1024.
    pub buffer_bound_scale: bool,
    /// P-STD_buffer_size_bound (13 bits).
    pub buffer_size_bound: u16,
}

impl StreamBound {
    fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            buffer_bound_scale: true,
            buffer_size_bound: 0,
        }
    }
}

/// System header (ISO/IEC 13818-1 2.5.3.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemHeader {
    /// rate_bound (22 bits), upper bound of any pack's program_mux_rate.
    pub rate_bound: u32,
    /// Number of audio streams (6 bits).
    pub audio_bound: u8,
    /// Fixed bitrate operation.
    pub fixed_flag: bool,
    /// Constrained system parameter stream.
    pub csps_flag: bool,
    /// Audio sampling locked to the system clock.
    pub system_audio_lock: bool,
    /// Video picture rate locked to the system clock.
    pub system_video_lock: bool,
    /// Number of video streams (5 bits).
    pub video_bound: u8,
    /// packet_rate_restriction_flag.
    pub packet_rate_restriction: bool,
    /// Per-stream buffer bounds, in header order.
    pub streams: Vec<StreamBound>,
}

impl SystemHeader {
    /// Header describing the map stream plus whichever elementary streams are active.
    pub fn for_streams(has_audio: bool, has_video: bool) -> Self {
        let mut streams = vec![StreamBound::new(STREAM_ID_PROGRAM_STREAM_MAP)];
        if has_video {
            streams.push(StreamBound::new(STREAM_ID_VIDEO));
        }
        if has_audio {
            streams.push(StreamBound::new(STREAM_ID_AUDIO));
        }

        Self {
            rate_bound: 0,
            audio_bound: has_audio as u8,
            fixed_flag: false,
            csps_flag: false,
            system_audio_lock: true,
            system_video_lock: true,
            video_bound: has_video as u8,
            packet_rate_restriction: false,
            streams,
        }
    }

    /// Value of the header_length field.
    pub fn header_length(&self) -> usize {
        6 + 3 * self.streams.len()
    }

    /// Serialized size including start code and length field.
    pub fn len(&self) -> usize {
        6 + self.header_length()
    }

    /// Always false; the header has fixed fields.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Appends the header to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let header_length = self.header_length();
        if header_length > u16::MAX as usize {
            return Err(MuxError::Range(format!(
                "system header of {} bytes overflows its length field",
                header_length
            )));
        }

        let mut bits = BitWriter::with_capacity(self.len());
        bits.write_bits(SYSTEM_HEADER_START_CODE as u64, 32)?;
        bits.write_bits(header_length as u64, 16)?;
        bits.write_marker();
        bits.write_bits(self.rate_bound as u64, 22)?;
        bits.write_marker();
        bits.write_bits(self.audio_bound as u64, 6)?;
        bits.write_bit(self.fixed_flag);
        bits.write_bit(self.csps_flag);
        bits.write_bit(self.system_audio_lock);
        bits.write_bit(self.system_video_lock);
        bits.write_marker();
        bits.write_bits(self.video_bound as u64, 5)?;
        bits.write_bit(self.packet_rate_restriction);
        bits.write_reserved(7);

        for stream in &self.streams {
            bits.write_bits(stream.stream_id as u64, 8)?;
            bits.write_bits(0b11, 2)?;
            bits.write_bit(stream.buffer_bound_scale);
            bits.write_bits(stream.buffer_size_bound as u64, 13)?;
        }

        buf.extend_from_slice(&bits.into_bytes()?);
        Ok(())
    }
}

/// Descriptor (ISO/IEC 13818-1 2.6), written as tag, length, data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// descriptor_tag.
    pub tag: u8,
    /// Descriptor payload, at most 255 bytes.
    pub data: Vec<u8>,
}

impl Descriptor {
    /// data_stream_alignment_descriptor with the given alignment type.
    pub fn data_stream_alignment(alignment_type: u8) -> Self {
        Self {
            tag: DATA_STREAM_ALIGNMENT_DESCRIPTOR,
            data: vec![alignment_type],
        }
    }

    fn len(&self) -> usize {
        2 + self.data.len()
    }
}

/// One elementary stream entry of the program stream map (ISO/IEC 13818-1 table 2-41).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    /// stream_type, e.g. [`STREAM_TYPE_H264`].
    pub stream_type: u8,
    /// PES stream id carrying the stream.
    pub elementary_stream_id: u8,
    /// Elementary stream descriptors.
    pub descriptors: Vec<Descriptor>,
}

impl ElementaryStreamInfo {
    fn info_length(&self) -> usize {
        self.descriptors.iter().map(Descriptor::len).sum()
    }

    fn len(&self) -> usize {
        4 + self.info_length()
    }
}

/// Program stream map (ISO/IEC 13818-1 2.5.4).
///
/// `program_info` is written verbatim as the program descriptors; here it
/// holds the audio object descriptor, which already carries its own tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStreamMap {
    /// program_stream_map_version (5 bits).
    pub version: u8,
    /// Program descriptors, written verbatim.
    pub program_info: Bytes,
    /// Elementary streams, in map order.
    pub entries: Vec<ElementaryStreamInfo>,
}

impl ProgramStreamMap {
    /// Map for the active streams, video first.
    pub fn for_streams(has_audio: bool, has_video: bool, audio_oid: &[u8]) -> Self {
        let mut entries = Vec::new();
        if has_video {
            entries.push(ElementaryStreamInfo {
                stream_type: STREAM_TYPE_H264,
                elementary_stream_id: STREAM_ID_VIDEO,
                descriptors: vec![Descriptor::data_stream_alignment(VIDEO_ALIGNMENT_TYPE)],
            });
        }
        if has_audio {
            entries.push(ElementaryStreamInfo {
                stream_type: STREAM_TYPE_AAC,
                elementary_stream_id: STREAM_ID_AUDIO,
                descriptors: vec![Descriptor::data_stream_alignment(AUDIO_ALIGNMENT_TYPE)],
            });
        }

        let program_info = if has_audio {
            Bytes::copy_from_slice(audio_oid)
        } else {
            Bytes::new()
        };

        Self {
            version: 0,
            program_info,
            entries,
        }
    }

    fn elementary_stream_map_length(&self) -> usize {
        self.entries.iter().map(ElementaryStreamInfo::len).sum()
    }

    /// Value of program_stream_map_length.
    pub fn map_length(&self) -> usize {
        // flags, info length, map length, CRC
        2 + 2 + self.program_info.len() + 2 + self.elementary_stream_map_length() + 4
    }

    /// Serialized size including start code and length field.
    pub fn len(&self) -> usize {
        6 + self.map_length()
    }

    /// Always false; the map has fixed fields.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Appends the map followed by its CRC32.
    pub fn write_to(&self, buf: &mut BytesMut, crc: &Crc32Mpeg2) -> Result<()> {
        let map_length = self.map_length();
        if map_length > u16::MAX as usize {
            return Err(MuxError::Range(format!(
                "program stream map of {} bytes overflows its length field",
                map_length
            )));
        }
        if self.version > 0x1F {
            return Err(MuxError::Range(format!(
                "program stream map version {} exceeds 5 bits",
                self.version
            )));
        }

        let mut section = BytesMut::with_capacity(self.len());
        section.put_u32(PROGRAM_STREAM_MAP_START_CODE);
        section.put_u16(map_length as u16);
        // current_next_indicator, reserved, version
        section.put_u8(0x80 | 0x60 | self.version);
        // reserved, marker
        section.put_u8(0xFF);

        section.put_u16(self.program_info.len() as u16);
        section.extend_from_slice(&self.program_info);

        section.put_u16(self.elementary_stream_map_length() as u16);
        for entry in &self.entries {
            section.put_u8(entry.stream_type);
            section.put_u8(entry.elementary_stream_id);
            section.put_u16(entry.info_length() as u16);
            for desc in &entry.descriptors {
                if desc.data.len() > u8::MAX as usize {
                    return Err(MuxError::Range(format!(
                        "descriptor 0x{:02x} of {} bytes",
                        desc.tag,
                        desc.data.len()
                    )));
                }
                section.put_u8(desc.tag);
                section.put_u8(desc.data.len() as u8);
                section.put_slice(&desc.data);
            }
        }

        let checksum = crc.calculate(&section);
        section.put_u32(checksum);

        buf.extend_from_slice(&section);
        Ok(())
    }
}

/// Appends the system header followed by the program stream map.
///
/// All lengths derive from the actual descriptor sizes. Nothing is appended
/// if either structure fails to encode.
pub fn write_system_header_and_map(
    buf: &mut BytesMut,
    has_audio: bool,
    has_video: bool,
    audio_oid: &[u8],
    crc: &Crc32Mpeg2,
) -> Result<()> {
    let header = SystemHeader::for_streams(has_audio, has_video);
    let map = ProgramStreamMap::for_streams(has_audio, has_video, audio_oid);

    let mut out = BytesMut::with_capacity(header.len() + map.len());
    header.write_to(&mut out)?;
    map.write_to(&mut out, crc)?;

    buf.extend_from_slice(&out);
    Ok(())
}

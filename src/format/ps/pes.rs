use bytes::{BufMut, BytesMut};

use super::types::*;
use crate::error::{MuxError, Result};

/// Bytes following PES_packet_length that are present in every packet:
/// the two flag bytes and PES_header_data_length.
const PES_OPTIONAL_HEADER_SIZE: usize = 3;
const PES_FIXED_HEADER_SIZE: usize = 6;
const TIMESTAMP_SIZE: usize = 5;

/// Packetized Elementary Stream header fields used by the muxer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/etc.)
    pub stream_id: u8,
    /// Data alignment indicator
    pub data_alignment: bool,
    /// Presentation Time Stamp (33 bits, 90 kHz)
    pub pts: Option<u64>,
    /// Decoding Time Stamp (33 bits, 90 kHz)
    pub dts: Option<u64>,
}

impl PESHeader {
    /// Creates a new PES header with a specific stream ID.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    /// Value of PES_header_data_length.
    pub fn header_data_length(&self) -> usize {
        match (self.pts, self.dts) {
            (Some(_), Some(_)) => 2 * TIMESTAMP_SIZE,
            (Some(_), None) => TIMESTAMP_SIZE,
            _ => 0,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, ts) in [("PTS", self.pts), ("DTS", self.dts)] {
            if let Some(ts) = ts {
                if ts > MAX_TIMESTAMP {
                    return Err(MuxError::Range(format!("{} {} exceeds 33 bits", name, ts)));
                }
            }
        }
        if self.dts.is_some() && self.pts.is_none() {
            return Err(MuxError::Range("DTS present without PTS".into()));
        }
        Ok(())
    }

    fn write_to(&self, buf: &mut BytesMut, packet_length: u16) -> Result<()> {
        buf.put_u8((PES_START_CODE_PREFIX >> 16) as u8);
        buf.put_u8((PES_START_CODE_PREFIX >> 8) as u8);
        buf.put_u8(PES_START_CODE_PREFIX as u8);
        buf.put_u8(self.stream_id);
        buf.put_u16(packet_length);

        // '10', scrambling 00, priority 0, alignment, copyright 0, original 0
        let mut flags = 0x80u8;
        if self.data_alignment {
            flags |= 0x04;
        }
        buf.put_u8(flags);

        let pts_dts_flags = match (self.pts, self.dts) {
            (Some(_), Some(_)) => 0xC0,
            (Some(_), None) => 0x80,
            _ => 0x00,
        };
        buf.put_u8(pts_dts_flags);
        buf.put_u8(self.header_data_length() as u8);

        if let Some(pts) = self.pts {
            let marker = if self.dts.is_some() { 0x30 } else { 0x20 };
            write_timestamp(buf, marker, pts);
        }
        if let Some(dts) = self.dts {
            write_timestamp(buf, 0x10, dts);
        }

        Ok(())
    }
}

/// A PES packet for one access unit.
///
/// Payloads too large for a single PES_packet_length are written as several
/// consecutive packets with the same stream id; only the first carries the
/// timestamps and the alignment flag.
#[derive(Debug, Clone, Default)]
pub struct PESPacket {
    /// PES header containing metadata and flags
    pub header: PESHeader,
    /// Elementary stream bytes
    pub payload: BytesMut,
}

impl PESPacket {
    /// Creates an empty packet for `stream_id`.
    pub fn new(stream_id: u8) -> Self {
        Self {
            header: PESHeader::new(stream_id),
            payload: BytesMut::new(),
        }
    }

    /// Changes the stream id.
    pub fn set_stream_id(&mut self, stream_id: u8) {
        self.header.stream_id = stream_id;
    }

    /// Sets data_alignment_indicator; the payload starts with an access unit.
    pub fn set_data_alignment_indicator(&mut self, aligned: bool) {
        self.header.data_alignment = aligned;
    }

    /// Sets the presentation timestamp in 90 kHz ticks.
    pub fn set_pts(&mut self, pts: u64) {
        self.header.pts = Some(pts);
    }

    /// Sets the decoding timestamp in 90 kHz ticks.
    pub fn set_dts(&mut self, dts: u64) {
        self.header.dts = Some(dts);
    }

    /// Appends elementary stream bytes.
    pub fn add_payload(&mut self, data: &[u8]) {
        self.payload.extend_from_slice(data);
    }

    fn first_capacity(&self) -> usize {
        MAX_PES_PACKET_LENGTH - PES_OPTIONAL_HEADER_SIZE - self.header.header_data_length()
    }

    fn continuation_capacity() -> usize {
        MAX_PES_PACKET_LENGTH - PES_OPTIONAL_HEADER_SIZE
    }

    /// Payload split at PES packet boundaries.
    fn segments(&self) -> Vec<&[u8]> {
        let first = self.payload.len().min(self.first_capacity());
        let (head, rest) = self.payload.split_at(first);

        let mut segments = vec![head];
        segments.extend(rest.chunks(Self::continuation_capacity()));
        segments
    }

    /// Number of PES packets the payload is written as.
    pub fn packet_count(&self) -> usize {
        self.segments().len()
    }

    /// Serialized size of all packets.
    pub fn len(&self) -> usize {
        let packets = self.packet_count();
        packets * (PES_FIXED_HEADER_SIZE + PES_OPTIONAL_HEADER_SIZE)
            + self.header.header_data_length()
            + self.payload.len()
    }

    /// Whether the packet carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Appends the serialized packet(s) to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        self.header.validate()?;

        let continuation = PESHeader::new(self.header.stream_id);
        for (index, segment) in self.segments().into_iter().enumerate() {
            let header = if index == 0 { &self.header } else { &continuation };
            let packet_length =
                PES_OPTIONAL_HEADER_SIZE + header.header_data_length() + segment.len();
            header.write_to(buf, packet_length as u16)?;
            buf.extend_from_slice(segment);
        }

        Ok(())
    }

    /// Serializes the packet(s) into a new buffer.
    pub fn to_bytes(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Writes a 33-bit timestamp with its 4-bit prefix and marker bits.
fn write_timestamp(buf: &mut BytesMut, marker: u8, ts: u64) {
    let ts = ts & MAX_TIMESTAMP;

    buf.put_u8(marker | ((ts >> 29) & 0x0E) as u8 | 0x01);
    buf.put_u16((((ts >> 14) & 0xFFFE) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xFFFE) | 0x01) as u16);
}

//! Rewrites a length-prefixed access unit into the Annex B form carried by
//! program stream video PES packets.
//!
//! The work happens in two passes over one owned buffer: missing units are
//! inserted at the front (still length-prefixed), then every prefix is
//! replaced by a 4-byte start code.

use bytes::BytesMut;
use std::ops::Range;

use super::types::NAL_START_CODE;
use crate::codec::h264::{put_length_prefix, LengthPrefixedNalus, NALUnitType, NalSummary};
use crate::config::MuxerConfig;
use crate::error::Result;

/// Access unit delimiter NAL unit for a picture type, without prefix.
pub fn access_unit_delimiter(summary: &NalSummary) -> [u8; 2] {
    [
        NALUnitType::AccessUnitDelimiter as u8,
        (summary.pic_type.primary_pic_type() << 5) | 0x10,
    ]
}

/// Inserts the units a program stream decoder needs ahead of the picture.
///
/// Video buffers without a delimiter get one. Key pictures additionally get
/// the configured parameter sets, verbatim, right after the delimiter (new or
/// already leading the buffer). Existing units are never altered or removed.
pub fn inject_required_units(
    buffer: &mut Vec<u8>,
    summary: &NalSummary,
    is_video: bool,
    config: &MuxerConfig,
) -> Result<()> {
    let mut prefix = BytesMut::new();

    if is_video && !summary.has_aud {
        let aud = access_unit_delimiter(summary);
        put_length_prefix(&mut prefix, aud.len(), config.nalu_length())?;
        prefix.extend_from_slice(&aud);
    }

    if summary.pic_type.is_key() && !config.sps_pps().is_empty() {
        log::debug!(
            "injecting {} bytes of parameter sets before key picture",
            config.sps_pps().len()
        );
        prefix.extend_from_slice(config.sps_pps());
    }

    if !prefix.is_empty() {
        let at = leading_delimiter_len(buffer, config.nalu_length());
        buffer.splice(at..at, prefix.iter().copied());
    }
    Ok(())
}

/// Length of a delimiter already opening the buffer, so inserted units land behind it.
fn leading_delimiter_len(buffer: &[u8], nalu_length: usize) -> usize {
    match LengthPrefixedNalus::new(buffer, nalu_length).next() {
        Some(Ok(unit))
            if unit.first().map(|&h| NALUnitType::from(h))
                == Some(NALUnitType::AccessUnitDelimiter) =>
        {
            nalu_length + unit.len()
        }
        _ => 0,
    }
}

fn unit_ranges(buffer: &[u8], nalu_length: usize) -> Result<Vec<Range<usize>>> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    for unit in LengthPrefixedNalus::new(buffer, nalu_length) {
        let start = cursor + nalu_length;
        let end = start + unit?.len();
        ranges.push(start..end);
        cursor = end;
    }
    Ok(ranges)
}

/// Replaces every `nalu_length`-byte prefix with `00 00 00 01`.
///
/// NAL payloads keep their bytes and order; each unit's framing becomes
/// exactly four bytes. The buffer is left untouched if any prefix is
/// malformed.
pub fn convert_length_to_start_code(buffer: &mut Vec<u8>, nalu_length: usize) -> Result<()> {
    let units = unit_ranges(buffer, nalu_length)?;

    if nalu_length == NAL_START_CODE.len() {
        for unit in &units {
            buffer[unit.start - NAL_START_CODE.len()..unit.start].copy_from_slice(&NAL_START_CODE);
        }
        return Ok(());
    }

    let converted_len: usize = units.iter().map(|u| NAL_START_CODE.len() + u.len()).sum();
    let mut converted = Vec::with_capacity(converted_len);
    for unit in units {
        converted.extend_from_slice(&NAL_START_CODE);
        converted.extend_from_slice(&buffer[unit]);
    }
    *buffer = converted;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::h264::PicType;
    use crate::error::MuxError;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    fn config_with_sps_pps(nalu_length: usize, sps_pps: &[u8]) -> MuxerConfig {
        let mut config = MuxerConfig::new();
        config.set_nalu_length(nalu_length).unwrap();
        config.set_sps_pps(sps_pps.to_vec());
        config
    }

    fn summary(has_aud: bool, pic_type: PicType) -> NalSummary {
        NalSummary {
            has_aud,
            pic_type,
            has_parameter_sets: false,
        }
    }

    #[test]
    fn test_inject_delimiter_and_parameter_sets() {
        let config = config_with_sps_pps(4, &[0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68]);
        let mut buffer = vec![0, 0, 0, 2, 0x65, 0x88];
        inject_required_units(&mut buffer, &summary(false, PicType::I), true, &config).unwrap();
        assert_eq!(
            buffer,
            vec![
                0, 0, 0, 2, 0x09, 0x10, 0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68, 0, 0, 0, 2, 0x65,
                0x88
            ]
        );
    }

    #[test]
    fn test_inject_delimiter_only_for_non_key() {
        let config = config_with_sps_pps(2, &[0, 1, 0x67]);
        let mut buffer = vec![0, 2, 0x41, 0x9a];
        inject_required_units(&mut buffer, &summary(false, PicType::B), true, &config).unwrap();
        assert_eq!(buffer, vec![0, 2, 0x09, 0x50, 0, 2, 0x41, 0x9a]);
    }

    #[test]
    fn test_inject_keeps_existing_delimiter() {
        let config = config_with_sps_pps(4, &[0, 0, 0, 1, 0x67]);
        let original = vec![0, 0, 0, 2, 0x09, 0x10, 0, 0, 0, 1, 0x65];
        let mut buffer = original.clone();
        inject_required_units(&mut buffer, &summary(true, PicType::I), true, &config).unwrap();
        assert_eq!(
            buffer,
            vec![0, 0, 0, 2, 0x09, 0x10, 0, 0, 0, 1, 0x67, 0, 0, 0, 1, 0x65]
        );

        let mut buffer = original.clone();
        inject_required_units(&mut buffer, &summary(true, PicType::P), true, &config).unwrap();
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_inject_without_configured_parameter_sets() {
        let config = MuxerConfig::new();
        let mut buffer = vec![0, 0, 0, 1, 0x65];
        inject_required_units(&mut buffer, &summary(false, PicType::I), true, &config).unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 2, 0x09, 0x10, 0, 0, 0, 1, 0x65]);
    }

    #[test]
    fn test_inject_skips_delimiter_for_non_video() {
        let config = MuxerConfig::new();
        let mut buffer = vec![0, 0, 0, 1, 0x41];
        inject_required_units(&mut buffer, &summary(false, PicType::Unknown), false, &config)
            .unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 1, 0x41]);
    }

    #[test]
    fn test_convert_in_place() {
        let mut buffer = vec![0, 0, 0, 2, 0x09, 0x30, 0, 0, 0, 3, 0x21, 0xe1, 0x04];
        convert_length_to_start_code(&mut buffer, 4).unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 1, 0x09, 0x30, 0, 0, 0, 1, 0x21, 0xe1, 0x04]);
    }

    #[test]
    fn test_convert_narrow_and_wide_prefixes() {
        let mut buffer = vec![2, 0x09, 0x30, 1, 0x21];
        convert_length_to_start_code(&mut buffer, 1).unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 1, 0x09, 0x30, 0, 0, 0, 1, 0x21]);

        let mut buffer = vec![0, 0, 0, 0, 0, 0, 0, 1, 0x21];
        convert_length_to_start_code(&mut buffer, 8).unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 1, 0x21]);
    }

    #[test]
    fn test_convert_malformed_leaves_buffer() {
        let original = vec![0, 0, 0, 1, 0x09, 0, 0, 0, 9, 0x21];
        let mut buffer = original.clone();
        assert!(matches!(
            convert_length_to_start_code(&mut buffer, 4),
            Err(MuxError::MalformedStream(_))
        ));
        assert_eq!(buffer, original);
    }

    #[quickcheck]
    fn prop_start_code_length_law(units: Vec<Vec<u8>>, width: u8) -> bool {
        let width = (width % 8) as usize + 1;
        let units: Vec<Vec<u8>> = units
            .into_iter()
            .map(|mut u| {
                u.truncate(if width == 1 { 255 } else { 1000 });
                u
            })
            .collect();

        let mut buffer = BytesMut::new();
        for unit in &units {
            put_length_prefix(&mut buffer, unit.len(), width).unwrap();
            buffer.extend_from_slice(unit);
        }
        let mut buffer = buffer.to_vec();
        let original_len = buffer.len() as isize;

        convert_length_to_start_code(&mut buffer, width).unwrap();

        let expected = original_len + units.len() as isize * (4 - width as isize);
        let payload: Vec<u8> = units.concat();
        let mut stripped = Vec::new();
        let mut offset = 0;
        for unit in &units {
            offset += 4;
            stripped.extend_from_slice(&buffer[offset..offset + unit.len()]);
            offset += unit.len();
        }
        buffer.len() as isize == expected && stripped == payload
    }
}

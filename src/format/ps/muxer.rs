use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::Arc;

use super::normalizer::{convert_length_to_start_code, inject_required_units};
use super::pack::{compute_mux_rate, ClockReference, PackHeader, PACK_HEADER_SIZE};
use super::pes::PESPacket;
use super::system::write_system_header_and_map;
use super::types::*;
use crate::av::Sample;
use crate::codec::h264::{H264Classifier, NalClassifier};
use crate::config::MuxerConfig;
use crate::error::{MuxError, Result};
use crate::utils::Crc32Mpeg2;

/// Turns access units into self-contained MPEG-2 program stream chunks.
///
/// Each call produces one chunk: a pack header, the system header and
/// program stream map when the sample is a key sample, then the PES
/// packet. Nothing is buffered between calls; the only state is the
/// session configuration.
pub struct ProgramStreamMuxer<C: NalClassifier = H264Classifier> {
    config: MuxerConfig,
    classifier: C,
    crc: Crc32Mpeg2,
}

impl ProgramStreamMuxer<H264Classifier> {
    /// Creates a muxer for H.264 video.
    pub fn new(config: MuxerConfig) -> Self {
        Self::with_classifier(config, H264Classifier::new())
    }
}

impl Default for ProgramStreamMuxer<H264Classifier> {
    fn default() -> Self {
        Self::new(MuxerConfig::default())
    }
}

impl<C: NalClassifier> ProgramStreamMuxer<C> {
    /// Creates a muxer that classifies access units with `classifier`.
    pub fn with_classifier(config: MuxerConfig, classifier: C) -> Self {
        Self {
            config,
            classifier,
            crc: Crc32Mpeg2::new(),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &MuxerConfig {
        &self.config
    }

    /// Mutable access for updating the session between samples.
    pub fn config_mut(&mut self) -> &mut MuxerConfig {
        &mut self.config
    }

    /// Appends a pack header, the system header and map for key samples, and
    /// the serialized `pes` to `out`.
    ///
    /// The mux rate is derived from the chunk size and `duration`. Returns
    /// the number of bytes appended; on error `out` is left unchanged.
    pub fn add_headers(
        &self,
        pes: &PESPacket,
        is_key_sample: bool,
        duration: u64,
        scr: impl Into<ClockReference>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let scr = scr.into();

        let mut system = BytesMut::new();
        if is_key_sample {
            write_system_header_and_map(
                &mut system,
                self.config.has_audio(),
                self.config.has_video(),
                self.config.audio_oid(),
                &self.crc,
            )?;
            log::debug!(
                "emitting system header and program stream map ({} bytes) at scr {}",
                system.len(),
                scr.base
            );
        }

        let pes_bytes = pes.to_bytes()?;
        let chunk_len = PACK_HEADER_SIZE + system.len() + pes_bytes.len();
        let mux_rate = compute_mux_rate(chunk_len, duration)?;

        let mut chunk = BytesMut::with_capacity(chunk_len);
        PackHeader::new(scr, mux_rate).write_to(&mut chunk)?;
        chunk.extend_from_slice(&system);
        chunk.extend_from_slice(&pes_bytes);

        log::trace!(
            "chunk of {} bytes, stream 0x{:02x}, mux rate {}",
            chunk.len(),
            pes.header.stream_id,
            mux_rate
        );
        out.extend_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Normalizes, packetizes and heads one sample, appending the chunk to `out`.
    ///
    /// Video samples are classified, completed with a delimiter (and the
    /// configured parameter sets for key pictures) and converted to start
    /// codes. Audio samples are carried verbatim. Returns the number of
    /// bytes appended; on error nothing is appended.
    pub fn process_sample(&self, sample: &Sample, out: &mut BytesMut) -> Result<usize> {
        let result = self.build_pes(sample).and_then(|pes| {
            self.add_headers(&pes, sample.is_key, sample.duration, sample.scr, out)
        });
        if let Err(e) = &result {
            log::warn!("dropping sample at pts {}: {}", sample.pts, e);
        }
        result
    }

    fn build_pes(&self, sample: &Sample) -> Result<PESPacket> {
        let stream_id = if sample.is_video {
            if !self.config.has_video() {
                return Err(MuxError::Configuration(
                    "video sample for a session without video".into(),
                ));
            }
            STREAM_ID_VIDEO
        } else {
            if !self.config.has_audio() {
                return Err(MuxError::Configuration(
                    "audio sample for a session without audio".into(),
                ));
            }
            STREAM_ID_AUDIO
        };

        let payload = if sample.is_video {
            self.normalize_video(sample)?
        } else {
            sample.data.to_vec()
        };

        let mut pes = PESPacket::new(stream_id);
        pes.set_data_alignment_indicator(sample.is_key);
        pes.set_pts(sample.pts);
        if sample.dts != sample.pts {
            pes.set_dts(sample.dts);
        }
        pes.add_payload(&payload);
        Ok(pes)
    }

    fn normalize_video(&self, sample: &Sample) -> Result<Vec<u8>> {
        let nalu_length = self.config.nalu_length();
        let mut buffer = sample.data.to_vec();

        let summary = self.classifier.classify(&buffer, nalu_length)?;
        if sample.is_key && self.config.sps_pps().is_empty() && !summary.has_parameter_sets {
            return Err(MuxError::Configuration(
                "key sample without configured or in-band parameter sets".into(),
            ));
        }

        inject_required_units(&mut buffer, &summary, true, &self.config)?;
        convert_length_to_start_code(&mut buffer, nalu_length)?;
        Ok(buffer)
    }
}

/// Cloneable handle that serializes samples from several producers into one muxer.
#[derive(Clone)]
pub struct SharedMuxer<C: NalClassifier = H264Classifier> {
    inner: Arc<Mutex<ProgramStreamMuxer<C>>>,
}

impl<C: NalClassifier> SharedMuxer<C> {
    /// Wraps `muxer` for shared use.
    pub fn new(muxer: ProgramStreamMuxer<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(muxer)),
        }
    }

    /// Processes a sample while holding the muxer exclusively.
    pub fn process_sample(&self, sample: &Sample, out: &mut BytesMut) -> Result<usize> {
        self.inner.lock().process_sample(sample, out)
    }

    /// Updates the session configuration between samples.
    pub fn update_config<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut MuxerConfig) -> Result<()>,
    {
        update(self.inner.lock().config_mut())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> MuxerConfig {
        self.inner.lock().config().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::h264::{NalSummary, PicType};
    use pretty_assertions::assert_eq;

    const SPS_PPS: [u8; 12] = [0, 0, 0, 3, 0x67, 0x42, 0xe0, 0, 0, 0, 1, 0x68];

    fn video_config() -> MuxerConfig {
        let mut config = MuxerConfig::new();
        config.set_sps_pps(SPS_PPS.to_vec());
        config
    }

    fn idr_sample() -> Sample {
        Sample::video(vec![0, 0, 0, 3, 0x25, 0xb8, 0x20])
            .with_key_flag(true)
            .with_timestamps(18000, 18000)
            .with_scr(0u64)
            .with_duration(9000)
    }

    fn p_sample() -> Sample {
        Sample::video(vec![0, 0, 0, 3, 0x21, 0xe1, 0x04])
            .with_timestamps(21000, 21000)
            .with_scr(3000u64)
            .with_duration(3000)
    }

    #[test]
    fn test_key_sample_layout() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let mut out = BytesMut::new();
        let written = muxer.process_sample(&idr_sample(), &mut out).unwrap();
        assert_eq!(written, out.len());

        assert_eq!(&out[..4], &[0x00, 0x00, 0x01, 0xba]);
        assert_eq!(&out[14..18], &[0x00, 0x00, 0x01, 0xbb]);
        let system_len = 6 + u16::from_be_bytes([out[18], out[19]]) as usize;
        let map_start = 14 + system_len;
        assert_eq!(&out[map_start..map_start + 4], &[0x00, 0x00, 0x01, 0xbc]);
        let map_len = 6 + u16::from_be_bytes([out[map_start + 4], out[map_start + 5]]) as usize;
        let pes_start = map_start + map_len;
        assert_eq!(&out[pes_start..pes_start + 4], &[0x00, 0x00, 0x01, 0xe0]);
        assert_eq!(out[pes_start + 6], 0x84);

        let payload = &out[pes_start + 14..];
        assert_eq!(
            payload,
            &[
                0, 0, 0, 1, 0x09, 0x10, 0, 0, 0, 1, 0x67, 0x42, 0xe0, 0, 0, 0, 1, 0x68, 0, 0, 0, 1,
                0x25, 0xb8, 0x20
            ]
        );
    }

    #[test]
    fn test_non_key_sample_has_no_system_header() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let mut out = BytesMut::new();
        muxer.process_sample(&p_sample(), &mut out).unwrap();

        assert_eq!(&out[14..18], &[0x00, 0x00, 0x01, 0xe0]);
        assert_eq!(out[20], 0x80);
        assert_eq!(&out[28..], &[0, 0, 0, 1, 0x09, 0x30, 0, 0, 0, 1, 0x21, 0xe1, 0x04]);
    }

    #[test]
    fn test_add_headers_appends() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let mut pes = PESPacket::new(STREAM_ID_VIDEO);
        pes.set_pts(0);
        pes.add_payload(&[0, 0, 0, 1, 0x09, 0x30]);

        let mut out = BytesMut::from(&b"prefix"[..]);
        let first = muxer.add_headers(&pes, false, 3000, 0u64, &mut out).unwrap();
        let second = muxer.add_headers(&pes, true, 3000, 0u64, &mut out).unwrap();
        assert_eq!(&out[..6], b"prefix");
        assert_eq!(first, PACK_HEADER_SIZE + pes.len());
        assert!(second > first);
        assert_eq!(out.len(), 6 + first + second);
    }

    #[test]
    fn test_dts_written_when_different() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let sample = p_sample().with_timestamps(24000, 21000);
        let mut out = BytesMut::new();
        muxer.process_sample(&sample, &mut out).unwrap();
        assert_eq!(&out[20..23], &[0x80, 0xc0, 0x0a]);
    }

    #[test]
    fn test_key_sample_requires_parameter_sets() {
        let muxer = ProgramStreamMuxer::new(MuxerConfig::new());
        let mut out = BytesMut::new();
        assert!(matches!(
            muxer.process_sample(&idr_sample(), &mut out),
            Err(MuxError::Configuration(_))
        ));
        assert!(out.is_empty());

        let in_band = Sample::video(vec![0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 3, 0x25, 0xb8, 0x20])
            .with_key_flag(true)
            .with_duration(3000);
        muxer.process_sample(&in_band, &mut out).unwrap();
    }

    #[test]
    fn test_malformed_sample_writes_nothing() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let sample = Sample::video(vec![0, 0, 0, 3, 0x21, 0xe1, 0x04, 0, 0, 0, 9, 0x21])
            .with_duration(3000);
        let mut out = BytesMut::from(&b"keep"[..]);
        assert!(matches!(
            muxer.process_sample(&sample, &mut out),
            Err(MuxError::MalformedStream(_))
        ));
        assert_eq!(&out[..], b"keep");
    }

    #[test]
    fn test_range_errors_write_nothing() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let mut out = BytesMut::new();

        let sample = p_sample().with_scr(MAX_TIMESTAMP + 1);
        assert!(matches!(
            muxer.process_sample(&sample, &mut out),
            Err(MuxError::Range(_))
        ));
        let sample = p_sample().with_duration(0);
        assert!(matches!(
            muxer.process_sample(&sample, &mut out),
            Err(MuxError::Range(_))
        ));
        assert!(out.is_empty());

        let sample = p_sample().with_duration(1);
        let written = muxer.process_sample(&sample, &mut out).unwrap();
        assert_eq!(written, out.len());
    }

    #[test]
    fn test_audio_sample_is_verbatim() {
        let mut config = video_config();
        config.set_has_audio(true);
        let muxer = ProgramStreamMuxer::new(config);
        let sample = Sample::audio(vec![0xff, 0xf1, 0x50, 0x80])
            .with_timestamps(9000, 9000)
            .with_scr(9000u64)
            .with_duration(1920);
        let mut out = BytesMut::new();
        muxer.process_sample(&sample, &mut out).unwrap();

        assert_eq!(&out[14..18], &[0x00, 0x00, 0x01, 0xc0]);
        assert_eq!(&out[28..], &[0xff, 0xf1, 0x50, 0x80]);
    }

    #[test]
    fn test_stream_not_in_session() {
        let muxer = ProgramStreamMuxer::new(video_config());
        let mut out = BytesMut::new();
        let sample = Sample::audio(vec![0xff]).with_duration(1920);
        assert!(matches!(
            muxer.process_sample(&sample, &mut out),
            Err(MuxError::Configuration(_))
        ));

        let mut config = video_config();
        config.set_has_video(false);
        let muxer = ProgramStreamMuxer::new(config);
        assert!(matches!(
            muxer.process_sample(&p_sample(), &mut out),
            Err(MuxError::Configuration(_))
        ));
        assert!(out.is_empty());
    }

    struct FixedClassifier(NalSummary);

    impl NalClassifier for FixedClassifier {
        fn classify(&self, _data: &[u8], _nalu_length: usize) -> Result<NalSummary> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_custom_classifier() {
        let summary = NalSummary {
            has_aud: true,
            pic_type: PicType::P,
            has_parameter_sets: false,
        };
        let muxer = ProgramStreamMuxer::with_classifier(video_config(), FixedClassifier(summary));
        let mut out = BytesMut::new();
        muxer.process_sample(&p_sample(), &mut out).unwrap();
        // classifier reported a delimiter, so none is injected
        assert_eq!(&out[28..], &[0, 0, 0, 1, 0x21, 0xe1, 0x04]);
    }

    #[test]
    fn test_shared_muxer() {
        let shared = SharedMuxer::new(ProgramStreamMuxer::new(MuxerConfig::new()));
        let producer = shared.clone();
        shared
            .update_config(|config| {
                config.set_sps_pps(SPS_PPS.to_vec());
                config.set_nalu_length(4)
            })
            .unwrap();
        assert_eq!(producer.config().sps_pps(), &SPS_PPS);

        let handle = std::thread::spawn(move || {
            let mut out = BytesMut::new();
            producer.process_sample(&idr_sample(), &mut out).map(|_| out)
        });
        let mut out = BytesMut::new();
        shared.process_sample(&p_sample(), &mut out).unwrap();
        let other = handle.join().unwrap().unwrap();
        assert_eq!(&other[14..18], &[0x00, 0x00, 0x01, 0xbb]);
        assert_eq!(&out[14..18], &[0x00, 0x00, 0x01, 0xe0]);
    }
}

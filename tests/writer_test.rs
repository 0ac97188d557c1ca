use bytes::BytesMut;
use psmux::av::{Muxer, Sample};
use psmux::config::MuxerConfig;
use psmux::error::{MuxError, Result};
use psmux::format::ps::{ProgramStreamMuxer, ProgramStreamWriter, SharedMuxer};
use tokio_test::io::Builder;

const SPS_PPS: [u8; 11] = [0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68];
const END_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xb9];

fn config() -> MuxerConfig {
    let mut config = MuxerConfig::new();
    config.set_sps_pps(SPS_PPS.to_vec());
    config
}

fn samples() -> Vec<Sample> {
    (0..5u64)
        .map(|i| {
            let data = if i == 0 {
                vec![0, 0, 0, 3, 0x25, 0xb8, 0x20]
            } else {
                vec![0, 0, 0, 3, 0x21, 0xe1, 0x04]
            };
            Sample::video(data)
                .with_key_flag(i == 0)
                .with_timestamps(i * 3000, i * 3000)
                .with_scr(i * 3000)
                .with_duration(3000)
        })
        .collect()
}

fn expected_stream() -> Result<Vec<u8>> {
    let muxer = ProgramStreamMuxer::new(config());
    let mut out = BytesMut::new();
    for sample in samples() {
        muxer.process_sample(&sample, &mut out)?;
    }
    out.extend_from_slice(&END_CODE);
    Ok(out.to_vec())
}

#[test]
fn test_writer_matches_muxer_output() -> Result<()> {
    let expected = expected_stream()?;
    let sink = Builder::new().write(&expected).build();

    tokio_test::block_on(async move {
        let mut writer = ProgramStreamWriter::new(sink, config());
        for sample in samples() {
            writer.write_sample(&sample).await?;
        }
        writer.write_trailer().await?;
        assert_eq!(writer.bytes_written(), expected.len() as u64);
        Ok::<(), MuxError>(())
    })
}

#[tokio::test]
async fn test_writer_skips_rejected_samples() -> Result<()> {
    let mut writer = ProgramStreamWriter::new(Vec::new(), config());
    let mut rejected = 0;

    for (i, sample) in samples().into_iter().enumerate() {
        let sample = if i == 2 {
            Sample::video(vec![0, 0, 0, 9, 0x21]).with_duration(3000)
        } else {
            sample
        };
        match writer.write_sample(&sample).await {
            Ok(()) => {}
            Err(MuxError::MalformedStream(_)) => rejected += 1,
            Err(e) => return Err(e),
        }
    }
    writer.write_trailer().await?;

    let out = writer.into_inner().await?;
    assert_eq!(rejected, 1);
    assert_eq!(&out[out.len() - 4..], &END_CODE);
    let packs = out.windows(4).filter(|w| *w == [0x00, 0x00, 0x01, 0xba]).count();
    assert_eq!(packs, 4);
    Ok(())
}

#[tokio::test]
async fn test_shared_muxer_across_tasks() -> Result<()> {
    let shared = SharedMuxer::new(ProgramStreamMuxer::new(config()));

    let mut handles = Vec::new();
    for sample in samples() {
        let muxer = shared.clone();
        handles.push(tokio::spawn(async move {
            let mut out = BytesMut::new();
            muxer.process_sample(&sample, &mut out).map(|_| out)
        }));
    }

    let mut key_chunks = 0;
    for handle in handles {
        let chunk = handle
            .await
            .map_err(|e| MuxError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        assert_eq!(&chunk[..4], &[0x00, 0x00, 0x01, 0xba]);
        if chunk[14..18] == [0x00, 0x00, 0x01, 0xbb] {
            key_chunks += 1;
        }
    }
    assert_eq!(key_chunks, 1);
    Ok(())
}

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::muxer::ProgramStreamMuxer;
use super::types::PROGRAM_END_CODE;
use crate::av::{Muxer, Sample};
use crate::codec::h264::{H264Classifier, NalClassifier};
use crate::config::MuxerConfig;
use crate::error::Result;

/// Streams program stream chunks to an async sink.
pub struct ProgramStreamWriter<W: AsyncWrite + Unpin + Send, C: NalClassifier = H264Classifier> {
    muxer: ProgramStreamMuxer<C>,
    stream_writer: BufWriter<W>,
    chunk: BytesMut,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> ProgramStreamWriter<W> {
    /// Creates a writer with an H.264 muxer for `config`.
    pub fn new(writer: W, config: MuxerConfig) -> Self {
        Self::with_muxer(writer, ProgramStreamMuxer::new(config))
    }
}

impl<W: AsyncWrite + Unpin + Send, C: NalClassifier> ProgramStreamWriter<W, C> {
    /// Creates a writer around an existing muxer.
    pub fn with_muxer(writer: W, muxer: ProgramStreamMuxer<C>) -> Self {
        Self {
            muxer,
            stream_writer: BufWriter::new(writer),
            chunk: BytesMut::new(),
            bytes_written: 0,
        }
    }

    /// The muxer producing chunks.
    pub fn muxer(&self) -> &ProgramStreamMuxer<C> {
        &self.muxer
    }

    /// Mutable access to the muxer, e.g. to update its configuration.
    pub fn muxer_mut(&mut self) -> &mut ProgramStreamMuxer<C> {
        &mut self.muxer
    }

    /// Total bytes handed to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes buffered output and returns the sink.
    pub async fn into_inner(mut self) -> Result<W> {
        self.stream_writer.flush().await?;
        Ok(self.stream_writer.into_inner())
    }

    async fn write_chunk(&mut self) -> Result<()> {
        self.stream_writer.write_all(&self.chunk).await?;
        self.bytes_written += self.chunk.len() as u64;
        self.chunk.clear();
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send, C: NalClassifier + Send> Muxer for ProgramStreamWriter<W, C> {
    async fn write_sample(&mut self, sample: &Sample) -> Result<()> {
        self.chunk.clear();
        self.muxer.process_sample(sample, &mut self.chunk)?;
        self.write_chunk().await
    }

    async fn write_trailer(&mut self) -> Result<()> {
        self.chunk.clear();
        self.chunk.put_u32(PROGRAM_END_CODE);
        self.write_chunk().await?;
        self.stream_writer.flush().await?;
        log::debug!("program stream closed after {} bytes", self.bytes_written);
        Ok(())
    }
}

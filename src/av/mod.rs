use async_trait::async_trait;

/// Sink that turns samples into a multiplexed byte stream.
#[async_trait]
pub trait Muxer: Send {
    /// Multiplexes one sample and writes its chunk.
    async fn write_sample(&mut self, sample: &Sample) -> crate::Result<()>;
    /// Terminates the stream and flushes the sink.
    async fn write_trailer(&mut self) -> crate::Result<()>;
}

mod packet;
pub use packet::*;

//! The capture loop: read one packet, write it, repeat.

use crate::error::Result;
use crate::format::ts::TsPacket;
use crate::format::{PacketReader, PacketWriter, ReadStatus};
use log::{debug, info, warn};
use std::future::Future;

/// How many packets to move. Zero on the command line means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketCount {
    /// Run until the source ends or an error occurs.
    Unbounded,
    /// Stop after this many packets.
    Limited(u64),
}

impl From<u64> for PacketCount {
    fn from(count: u64) -> Self {
        if count == 0 {
            PacketCount::Unbounded
        } else {
            PacketCount::Limited(count)
        }
    }
}

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of packets was forwarded.
    CountReached,
    /// The source ran dry.
    EndOfStream,
    /// The shutdown future completed.
    Interrupted,
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Packets read and written.
    pub packets: u64,
    /// Why the loop ended.
    pub stop: StopReason,
}

/// Moves packets from one source to one sink through a single reused buffer.
///
/// Reads and writes strictly alternate. The first error ends the run.
pub struct CapturePipeline<R, W> {
    source: R,
    sink: W,
    count: PacketCount,
    packet: TsPacket,
}

impl<R: PacketReader, W: PacketWriter> CapturePipeline<R, W> {
    /// Sets up a run of `count` packets; zero means unbounded.
    pub fn new(source: R, sink: W, count: impl Into<PacketCount>) -> Self {
        Self {
            source,
            sink,
            count: count.into(),
            packet: TsPacket::new(),
        }
    }

    /// The packet source.
    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// The packet sink.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Gives back source and sink, e.g. to release the source.
    pub fn into_parts(self) -> (R, W) {
        (self.source, self.sink)
    }

    /// Runs until the count is reached, the source ends or an error occurs.
    pub async fn run(&mut self) -> Result<CaptureSummary> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`CapturePipeline::run`], but also stops between packets once
    /// `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<CaptureSummary>
    where
        F: Future<Output = ()>,
    {
        info!("Capture started ({:?})", self.count);
        tokio::pin!(shutdown);

        let mut packets = 0u64;
        let result = loop {
            if let PacketCount::Limited(limit) = self.count {
                if packets == limit {
                    break Ok(StopReason::CountReached);
                }
            }

            // only the read races the shutdown; a packet once read is always written
            let status = tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(StopReason::Interrupted),
                status = self.source.read_packet(&mut self.packet) => status,
            };
            match status {
                Ok(ReadStatus::Packet) => {}
                Ok(ReadStatus::EndOfStream) => break Ok(StopReason::EndOfStream),
                Err(e) => break Err(e),
            }
            if let Err(e) = self.sink.write_packet(&self.packet).await {
                break Err(e);
            }
            packets += 1;
        };

        // flush what made it through even when failing
        let finished = self.sink.finish().await;
        let stop = match (result, finished) {
            (Ok(stop), Ok(())) => stop,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), finished) => {
                if let Err(flush_err) = finished {
                    warn!("Failed to flush sink: {}", flush_err);
                }
                debug!("Capture failed after {} packets", packets);
                return Err(e);
            }
        };

        info!("Capture stopped after {} packets ({:?})", packets, stop);
        Ok(CaptureSummary { packets, stop })
    }
}

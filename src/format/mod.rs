use crate::error::{CaptureError, Result};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

use self::ts::TsPacket;

pub mod ts;
pub mod udp;

/// Outcome of a successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The buffer holds a fresh packet.
    Packet,
    /// The source is exhausted; the buffer is unchanged.
    EndOfStream,
}

/// Anything that produces transport stream packets
#[async_trait::async_trait]
pub trait PacketReader: Send {
    /// Read the next packet into `pkt`, overwriting its previous content
    async fn read_packet(&mut self, pkt: &mut TsPacket) -> Result<ReadStatus>;
}

/// Anything that consumes transport stream packets
#[async_trait::async_trait]
pub trait PacketWriter: Send {
    /// Write one packet
    async fn write_packet(&mut self, pkt: &TsPacket) -> Result<()>;

    /// Flush anything buffered
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads exactly one packet from a byte stream.
///
/// A clean end of input before the first byte is reported as
/// [`ReadStatus::EndOfStream`]; running dry mid-packet is an error.
pub async fn read_full_packet<R>(reader: &mut R, pkt: &mut TsPacket) -> Result<ReadStatus>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let buf = pkt.as_mut_bytes();
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) if filled == 0 => return Ok(ReadStatus::EndOfStream),
            Ok(0) => return Err(CaptureError::TruncatedPacket(filled)),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ReadStatus::Packet)
}

pub mod tests {
    //! In-memory readers and writers for exercising the pipeline.
    use super::*;

    /// Produces packets on one PID, either forever or up to a limit.
    #[derive(Debug)]
    pub struct SyntheticSource {
        pid: u16,
        limit: Option<u64>,
        /// Packets handed out so far.
        pub produced: u64,
    }

    impl SyntheticSource {
        /// Ends the stream after `packets` packets.
        pub fn finite(pid: u16, packets: u64) -> Self {
            Self {
                pid,
                limit: Some(packets),
                produced: 0,
            }
        }

        /// Never ends.
        pub fn endless(pid: u16) -> Self {
            Self {
                pid,
                limit: None,
                produced: 0,
            }
        }
    }

    #[async_trait::async_trait]
    impl PacketReader for SyntheticSource {
        async fn read_packet(&mut self, pkt: &mut TsPacket) -> Result<ReadStatus> {
            if self.limit == Some(self.produced) {
                return Ok(ReadStatus::EndOfStream);
            }
            *pkt = TsPacket::with_pid(self.pid);
            pkt.set_continuity_counter((self.produced % 16) as u8);
            self.produced += 1;
            Ok(ReadStatus::Packet)
        }
    }

    /// Keeps every packet written to it.
    #[derive(Debug, Default)]
    pub struct CollectingSink {
        /// Everything written, in order.
        pub packets: Vec<TsPacket>,
        /// Set by `finish`.
        pub finished: bool,
    }

    impl CollectingSink {
        /// An empty sink.
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait::async_trait]
    impl PacketWriter for CollectingSink {
        async fn write_packet(&mut self, pkt: &TsPacket) -> Result<()> {
            self.packets.push(pkt.clone());
            Ok(())
        }

        async fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }
}

pub use self::ts::{PidSet, TS_PACKET_SIZE};
pub use self::udp::{McastAddr, UdpPacketReader, UdpPacketWriter};

//! Packet sinks: nowhere, a file, or a UDP peer.

use crate::error::{CaptureError, Result};
use crate::format::ts::TsPacket;
use crate::format::udp::UdpPacketWriter;
use crate::format::PacketWriter;
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Destination chosen from the `-out` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    /// Empty destination: read and drop.
    Discard,
    /// Anything with a colon: `HOST:PORT`, split at the first colon.
    Udp {
        /// Empty means the local system.
        host: String,
        /// Port, not yet validated.
        port: String,
    },
    /// Anything else is a file path.
    File(PathBuf),
}

impl SinkSpec {
    /// Classifies the destination. Never fails; errors surface in [`SinkSpec::open`].
    pub fn parse(dest: &str) -> Self {
        if dest.is_empty() {
            SinkSpec::Discard
        } else if let Some((host, port)) = dest.split_once(':') {
            SinkSpec::Udp {
                host: host.to_string(),
                port: port.to_string(),
            }
        } else {
            SinkSpec::File(PathBuf::from(dest))
        }
    }

    /// Creates the file or connects the socket.
    pub async fn open(&self) -> Result<Sink> {
        match self {
            SinkSpec::Discard => {
                info!("Discarding packets");
                Ok(Sink::Discard(DiscardSink))
            }
            SinkSpec::Udp { host, port } => Ok(Sink::Udp(UdpPacketWriter::connect(host, port).await?)),
            SinkSpec::File(path) => Ok(Sink::File(FileSink::create(path).await?)),
        }
    }
}

impl From<&str> for SinkSpec {
    fn from(dest: &str) -> Self {
        Self::parse(dest)
    }
}

/// Accepts everything, keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait::async_trait]
impl PacketWriter for DiscardSink {
    async fn write_packet(&mut self, _pkt: &TsPacket) -> Result<()> {
        Ok(())
    }
}

/// Appends raw packets to a file, truncating it first.
#[derive(Debug)]
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Creates or truncates the file at `path`.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).await.map_err(|e| {
            CaptureError::Io(std::io::Error::new(
                e.kind(),
                format!("create {}: {}", path.display(), e),
            ))
        })?;
        info!("Writing packets to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

#[async_trait::async_trait]
impl PacketWriter for FileSink {
    async fn write_packet(&mut self, pkt: &TsPacket) -> Result<()> {
        self.writer.write_all(pkt.as_bytes()).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// The sink selected at startup.
#[derive(Debug)]
pub enum Sink {
    /// `-out` was empty.
    Discard(DiscardSink),
    /// `-out` was a path.
    File(FileSink),
    /// `-out` was `HOST:PORT`.
    Udp(UdpPacketWriter),
}

#[async_trait::async_trait]
impl PacketWriter for Sink {
    async fn write_packet(&mut self, pkt: &TsPacket) -> Result<()> {
        match self {
            Sink::Discard(s) => s.write_packet(pkt).await,
            Sink::File(s) => s.write_packet(pkt).await,
            Sink::Udp(s) => s.write_packet(pkt).await,
        }
    }

    async fn finish(&mut self) -> Result<()> {
        match self {
            Sink::Discard(s) => s.finish().await,
            Sink::File(s) => s.finish().await,
            Sink::Udp(s) => s.finish().await,
        }
    }
}

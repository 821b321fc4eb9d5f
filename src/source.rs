//! Packet sources: a DVB tuner, a unicast UDP listener or a multicast group.

use crate::dvb::{DemuxFilter, DemuxOutput, Frontend, TuneParams};
use crate::error::{CaptureError, Result};
use crate::format::ts::{PidSet, TsPacket};
use crate::format::udp::UdpPacketReader;
use crate::format::{read_full_packet, PacketReader, ReadStatus};
use log::{debug, info};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// How long tuning may take before giving up.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Value of the `-src` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `rf`: a DVB tuner
    Rf,
    /// `udp`: a unicast listener
    Udp,
    /// `mcast`: a multicast group
    Mcast,
}

impl FromStr for SourceKind {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rf" => Ok(SourceKind::Rf),
            "udp" => Ok(SourceKind::Udp),
            "mcast" => Ok(SourceKind::Mcast),
            _ => Err(CaptureError::Usage(format!("Unknown source: {}", s))),
        }
    }
}

/// Device paths and tuning parameters of an RF source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfParams {
    /// Frontend device, e.g. `/dev/dvb/adapter0/frontend0`.
    pub frontend: PathBuf,
    /// Demux device the PID filter is installed on.
    pub demux: PathBuf,
    /// Read from this DVR device instead of the demux filter.
    pub dvr: Option<PathBuf>,
    /// What to tune to.
    pub tune: TuneParams,
    /// How long to wait for the frontend to lock.
    pub lock_timeout: Duration,
    /// Log every frontend status change while waiting for lock.
    pub verbose: bool,
}

/// A fully described source, ready to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A DVB tuner.
    Rf(RfParams),
    /// `IP:PORT` to listen on.
    Udp(String),
    /// `GROUP:PORT@INTERFACE` to join.
    Mcast(String),
}

impl SourceSpec {
    /// The `-src` value this source corresponds to.
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSpec::Rf(_) => SourceKind::Rf,
            SourceSpec::Udp(_) => SourceKind::Udp,
            SourceSpec::Mcast(_) => SourceKind::Mcast,
        }
    }

    /// Opens the source. For RF this tunes and blocks until lock.
    pub async fn open(self, pids: PidSet) -> Result<Source> {
        match self {
            SourceSpec::Rf(params) => Ok(Source::Rf(RfSource::open(params, &pids).await?)),
            SourceSpec::Udp(laddr) => Ok(Source::Udp(UdpPacketReader::listen(&laddr, pids).await?)),
            SourceSpec::Mcast(laddr) => Ok(Source::Udp(
                UdpPacketReader::listen_multicast(&laddr, pids).await?,
            )),
        }
    }
}

/// Tuned frontend plus the demux filter feeding us.
#[derive(Debug)]
pub struct RfSource {
    // field order is drop order: stop reading, release the filter, close the frontend
    dvr: Option<tokio::fs::File>,
    filter: DemuxFilter,
    frontend: Frontend,
}

impl RfSource {
    /// Tunes, waits for lock, then installs the PID filter.
    pub async fn open(params: RfParams, pids: &PidSet) -> Result<Self> {
        let frontend = Frontend::tune(&params.frontend, &params.tune)?;
        let status = frontend
            .wait_for_lock(Instant::now() + params.lock_timeout, params.verbose)
            .await?;
        info!("Frontend {} locked ({})", frontend.path().display(), status);

        let output = if params.dvr.is_some() {
            DemuxOutput::Dvr
        } else {
            DemuxOutput::Filter
        };
        let filter = DemuxFilter::open(&params.demux, pids, output)?;

        let dvr = match &params.dvr {
            Some(path) => Some(tokio::fs::File::open(path).await.map_err(|e| {
                CaptureError::device(&format!("open {}", path.display()), e)
            })?),
            None => None,
        };

        Ok(Self {
            dvr,
            filter,
            frontend,
        })
    }

    /// Stops the demux filter. The frontend stays tuned until dropped.
    pub fn release(&mut self) -> Result<()> {
        debug!("Releasing filter tuned on {}", self.frontend.path().display());
        self.filter.release()
    }
}

#[async_trait::async_trait]
impl PacketReader for RfSource {
    async fn read_packet(&mut self, pkt: &mut TsPacket) -> Result<ReadStatus> {
        let status = match self.dvr.as_mut() {
            Some(dvr) => read_full_packet(dvr, pkt).await?,
            None => read_full_packet(self.filter.reader(), pkt).await?,
        };
        if status == ReadStatus::Packet {
            pkt.check_sync()?;
        }
        Ok(status)
    }
}

/// The source selected at startup.
#[derive(Debug)]
pub enum Source {
    /// A tuned DVB frontend.
    Rf(RfSource),
    /// Unicast and multicast listeners share one reader.
    Udp(UdpPacketReader),
}

impl Source {
    /// Releases kernel-side state (the RF demux filter). A no-op for UDP.
    pub fn release(&mut self) -> Result<()> {
        match self {
            Source::Rf(rf) => rf.release(),
            Source::Udp(_) => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl PacketReader for Source {
    async fn read_packet(&mut self, pkt: &mut TsPacket) -> Result<ReadStatus> {
        match self {
            Source::Rf(rf) => rf.read_packet(pkt).await,
            Source::Udp(udp) => udp.read_packet(pkt).await,
        }
    }
}

//! # Transport stream over UDP
//!
//! Receiving and sending MPEG-TS packets carried in UDP datagrams, the way
//! IPTV headends and `dvbdd` itself emit them:
//!
//! - one or more whole 188-byte packets per datagram
//! - optionally behind an RTP header (RFC 2250), which is stripped
//! - unicast or multicast (IPv4 group joined on a chosen interface)
//!
//! ## Example: forwarding between two sockets
//!
//! ```rust,no_run
//! use dvbdd::format::ts::{PidSet, TsPacket};
//! use dvbdd::format::udp::{UdpPacketReader, UdpPacketWriter};
//! use dvbdd::format::{PacketReader, PacketWriter, ReadStatus};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = UdpPacketReader::listen("0.0.0.0:1234", PidSet::parse(["8192"])?).await?;
//! let mut writer = UdpPacketWriter::connect("239.1.1.1", "5000").await?;
//!
//! let mut pkt = TsPacket::new();
//! while reader.read_packet(&mut pkt).await? == ReadStatus::Packet {
//!     writer.write_packet(&pkt).await?;
//! }
//! # Ok(())
//! # }
//! ```

use super::ts::{PidSet, TsPacket, TS_PACKET_SIZE};
use super::{PacketReader, PacketWriter, ReadStatus};
use crate::error::{CaptureError, Result};
use bytes::{Buf, Bytes};
use log::{debug, info};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

const MAX_DATAGRAM_SIZE: usize = 65536;
const RTP_HEADER_SIZE: usize = 12;

/// Interface a multicast group is joined on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McastInterface {
    /// Let the kernel pick.
    Any,
    /// Address of the local interface.
    Addr(Ipv4Addr),
    /// Interface name such as `eth0`.
    Name(String),
}

/// Parsed `GROUP:PORT@INTERFACE` listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McastAddr {
    /// Multicast group to join.
    pub group: Ipv4Addr,
    /// UDP port to bind.
    pub port: u16,
    /// Where to join.
    pub interface: McastInterface,
}

impl McastAddr {
    /// Parses `GROUP:PORT@INTERFACE`. The `@INTERFACE` part is optional.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CaptureError::InvalidAddress {
            addr: s.to_string(),
            reason: reason.to_string(),
        };

        let (group_port, interface) = match s.split_once('@') {
            Some((gp, "")) => (gp, McastInterface::Any),
            Some((gp, iface)) => match iface.parse::<Ipv4Addr>() {
                Ok(addr) => (gp, McastInterface::Addr(addr)),
                Err(_) => (gp, McastInterface::Name(iface.to_string())),
            },
            None => (s, McastInterface::Any),
        };

        let (group, port) = group_port
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected GROUP:PORT@INTERFACE"))?;
        let group: Ipv4Addr = group
            .parse()
            .map_err(|_| invalid("group is not an IPv4 address"))?;
        if !group.is_multicast() {
            return Err(invalid("group is not a multicast address"));
        }
        let port = port.parse().map_err(|_| invalid("bad port"))?;

        Ok(Self {
            group,
            port,
            interface,
        })
    }
}

/// Reads TS packets from a UDP socket, keeping only the requested PIDs.
#[derive(Debug)]
pub struct UdpPacketReader {
    socket: UdpSocket,
    pids: PidSet,
    pending: Bytes,
    recv_buf: Vec<u8>,
}

impl UdpPacketReader {
    /// Wraps an already bound socket.
    pub fn from_socket(socket: UdpSocket, pids: PidSet) -> Self {
        Self {
            socket,
            pids,
            pending: Bytes::new(),
            recv_buf: vec![0; MAX_DATAGRAM_SIZE],
        }
    }

    /// Binds a unicast listener on `laddr` (`IP:PORT`).
    pub async fn listen(laddr: &str, pids: PidSet) -> Result<Self> {
        let socket = UdpSocket::bind(laddr).await.map_err(|e| CaptureError::InvalidAddress {
            addr: laddr.to_string(),
            reason: e.to_string(),
        })?;
        info!("Listening for UDP on {}", socket.local_addr()?);
        Ok(Self::from_socket(socket, pids))
    }

    /// Binds to the group's port and joins the group.
    pub async fn listen_multicast(laddr: &str, pids: PidSet) -> Result<Self> {
        let addr = McastAddr::parse(laddr)?;
        let socket = UdpSocket::bind(SocketAddr::from((addr.group, addr.port))).await?;

        match &addr.interface {
            McastInterface::Any => socket.join_multicast_v4(addr.group, Ipv4Addr::UNSPECIFIED)?,
            McastInterface::Addr(iface) => socket.join_multicast_v4(addr.group, *iface)?,
            McastInterface::Name(name) => join_on_named_interface(&socket, addr.group, name)?,
        }
        info!(
            "Joined multicast group {}:{} on {:?}",
            addr.group, addr.port, addr.interface
        );
        Ok(Self::from_socket(socket, pids))
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn recv_datagram(&mut self) -> Result<()> {
        let n = self.socket.recv(&mut self.recv_buf).await?;
        let data = &self.recv_buf[..n];
        let start = rtp_payload_offset(data).unwrap_or(0);
        let payload = &data[start..];
        if payload.len() % TS_PACKET_SIZE != 0 {
            return Err(CaptureError::TruncatedPacket(payload.len() % TS_PACKET_SIZE));
        }
        self.pending = Bytes::copy_from_slice(payload);
        Ok(())
    }
}

#[async_trait::async_trait]
impl PacketReader for UdpPacketReader {
    async fn read_packet(&mut self, pkt: &mut TsPacket) -> Result<ReadStatus> {
        loop {
            while self.pending.remaining() >= TS_PACKET_SIZE {
                self.pending.copy_to_slice(pkt.as_mut_bytes());
                pkt.check_sync()?;
                if self.pids.matches(pkt.pid()) {
                    return Ok(ReadStatus::Packet);
                }
            }
            self.recv_datagram().await?;
        }
    }
}

/// Offset of the TS payload when `data` is an RTP packet carrying whole TS
/// packets, `None` when it is raw TS.
fn rtp_payload_offset(data: &[u8]) -> Option<usize> {
    if data.len() % TS_PACKET_SIZE == 0 || data.len() < RTP_HEADER_SIZE || data[0] >> 6 != 2 {
        return None;
    }
    let csrc_count = (data[0] & 0x0f) as usize;
    let mut offset = RTP_HEADER_SIZE + csrc_count * 4;
    if data[0] & 0x10 != 0 {
        if data.len() < offset + 4 {
            return None;
        }
        let ext_words = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        offset += 4 + ext_words * 4;
    }
    if offset > data.len() || (data.len() - offset) % TS_PACKET_SIZE != 0 {
        return None;
    }
    Some(offset)
}

#[cfg(target_os = "linux")]
fn join_on_named_interface(socket: &UdpSocket, group: Ipv4Addr, name: &str) -> Result<()> {
    use std::ffi::CString;
    use std::os::fd::AsRawFd;

    let invalid = |reason: String| CaptureError::InvalidAddress {
        addr: name.to_string(),
        reason,
    };
    let c_name = CString::new(name).map_err(|e| invalid(e.to_string()))?;
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(invalid(std::io::Error::last_os_error().to_string()));
    }

    let mreq = libc::ip_mreqn {
        imr_multiaddr: libc::in_addr {
            s_addr: u32::from(group).to_be(),
        },
        imr_address: libc::in_addr { s_addr: 0 },
        imr_ifindex: index as libc::c_int,
    };
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IP,
            libc::IP_ADD_MEMBERSHIP,
            &mreq as *const libc::ip_mreqn as *const libc::c_void,
            std::mem::size_of::<libc::ip_mreqn>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    debug!("Interface {} has index {}", name, index);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn join_on_named_interface(_socket: &UdpSocket, _group: Ipv4Addr, name: &str) -> Result<()> {
    Err(CaptureError::InvalidAddress {
        addr: name.to_string(),
        reason: "interface names are only supported on Linux, use an address".into(),
    })
}

/// Sends every packet as its own datagram.
#[derive(Debug)]
pub struct UdpPacketWriter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpPacketWriter {
    /// Resolves `host:port` and connects a send socket to it. An empty host
    /// means the local system.
    pub async fn connect(host: &str, port: &str) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let invalid = |reason: String| CaptureError::InvalidAddress {
            addr: addr.clone(),
            reason,
        };

        let port: u16 = port.parse().map_err(|_| invalid("bad port".into()))?;
        let host = if host.is_empty() { "127.0.0.1" } else { host };
        let target = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host did not resolve".into()))?;

        let bind: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(target).await?;
        info!("Sending UDP to {}", target);

        Ok(Self { socket, target })
    }

    /// Resolved destination.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait::async_trait]
impl PacketWriter for UdpPacketWriter {
    async fn write_packet(&mut self, pkt: &TsPacket) -> Result<()> {
        let sent = self.socket.send(pkt.as_bytes()).await?;
        if sent != TS_PACKET_SIZE {
            return Err(CaptureError::TruncatedPacket(sent));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;

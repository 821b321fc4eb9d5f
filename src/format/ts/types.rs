use crate::error::{CaptureError, Result};
use std::fmt;

/// Size of one packet on the wire
pub const TS_PACKET_SIZE: usize = 188;
/// Fixed header in front of the adaptation field and payload
pub const TS_HEADER_SIZE: usize = 4;
/// First byte of every packet
pub const SYNC_BYTE: u8 = 0x47;

/// Program association table
pub const PID_PAT: u16 = 0x0000;
/// Stuffing packets
pub const PID_NULL: u16 = 0x1fff;
/// Pseudo PID the Linux demux understands as "the whole transport stream".
pub const PID_ALL: u16 = 0x2000;

/// One transport stream packet.
///
/// The payload is opaque here; only the sync byte and the PID are looked at.
#[derive(Clone, PartialEq, Eq)]
pub struct TsPacket([u8; TS_PACKET_SIZE]);

impl Default for TsPacket {
    fn default() -> Self {
        Self([0; TS_PACKET_SIZE])
    }
}

impl TsPacket {
    /// An all-zero packet, used as a read buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload-only packet carrying `pid` with an empty (stuffed) payload.
    pub fn with_pid(pid: u16) -> Self {
        let mut pkt = Self([0xff; TS_PACKET_SIZE]);
        pkt.0[..TS_HEADER_SIZE].copy_from_slice(&[SYNC_BYTE, 0x00, 0x00, 0x10]);
        pkt.set_pid(pid);
        pkt
    }

    /// Copies exactly one packet out of `data`.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bytes: [u8; TS_PACKET_SIZE] = data
            .try_into()
            .map_err(|_| CaptureError::TruncatedPacket(data.len()))?;
        Ok(Self(bytes))
    }

    /// Raw packet bytes, header included.
    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.0
    }

    /// Buffer to read a packet into.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; TS_PACKET_SIZE] {
        &mut self.0
    }

    /// First byte is 0x47.
    pub fn sync_ok(&self) -> bool {
        self.0[0] == SYNC_BYTE
    }

    /// Fails with [`CaptureError::Sync`] unless the packet starts with 0x47.
    pub fn check_sync(&self) -> Result<()> {
        if self.sync_ok() {
            Ok(())
        } else {
            Err(CaptureError::Sync(self.0[0]))
        }
    }

    /// 13-bit packet identifier.
    pub fn pid(&self) -> u16 {
        (((self.0[1] & 0x1f) as u16) << 8) | self.0[2] as u16
    }

    /// Rewrites the PID, keeping the other header bits.
    pub fn set_pid(&mut self, pid: u16) {
        self.0[1] = (self.0[1] & 0xe0) | ((pid >> 8) & 0x1f) as u8;
        self.0[2] = (pid & 0xff) as u8;
    }

    /// 4-bit continuity counter.
    pub fn continuity_counter(&self) -> u8 {
        self.0[3] & 0x0f
    }

    /// Rewrites the continuity counter; only the low 4 bits of `cc` are used.
    pub fn set_continuity_counter(&mut self, cc: u8) {
        self.0[3] = (self.0[3] & 0xf0) | (cc & 0x0f);
    }
}

impl fmt::Debug for TsPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsPacket")
            .field("sync_ok", &self.sync_ok())
            .field("pid", &self.pid())
            .field("cc", &self.continuity_counter())
            .finish()
    }
}

//! # MPEG Transport Stream packets
//!
//! This module holds the fixed-size packet container moved through the
//! capture pipeline and the PID set used to filter it.
//!
//! The capture tool never looks inside a packet beyond its sync byte and
//! PID, so there is no PSI/PES handling here.
//!
//! ## Example Usage
//!
//! ```rust
//! use dvbdd::format::ts::{PidSet, TsPacket, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pids = PidSet::parse(["0", "0x100"])?;
//!
//! let pkt = TsPacket::with_pid(256);
//! assert!(pkt.sync_ok());
//! assert!(pids.matches(pkt.pid()));
//! assert_eq!(pkt.as_bytes().len(), TS_PACKET_SIZE);
//! # Ok(())
//! # }
//! ```

/// PID list parsing and matching
pub mod pid;

/// Packet container and constants
pub mod types;

#[cfg(test)]
mod tests;

pub use pid::{PidSet, MAX_PID};
pub use types::{TsPacket, PID_ALL, PID_NULL, PID_PAT, SYNC_BYTE, TS_HEADER_SIZE, TS_PACKET_SIZE};

//! # Linux DVB devices
//!
//! Thin wrappers over the kernel DVB API used by the RF source:
//!
//! - [`Frontend`]: tune to a multiplex and wait for lock
//! - [`DemuxFilter`]: restrict the demux to a PID set and route packets to
//!   the DVR device or to the filter descriptor itself
//!
//! Both own their file descriptors; dropping them releases the kernel state.

use crate::error::CaptureError;
use std::fmt;
use std::str::FromStr;

/// Demux PES filter
pub mod demux;

/// Frontend tuning and lock detection
pub mod frontend;
mod sys;

pub use demux::{DemuxFilter, DemuxOutput};
pub use frontend::{FeStatus, Frontend, TuneParams};

/// Delivery system, as given by the `-sys` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySystem {
    /// `t`
    DvbT,
    /// `s`
    DvbS,
    /// `s2`
    DvbS2,
    /// `ca`
    DvbCAnnexA,
    /// `cb`
    DvbCAnnexB,
    /// `cc`
    DvbCAnnexC,
}

impl DeliverySystem {
    /// DVB-S or DVB-S2.
    pub fn is_satellite(self) -> bool {
        matches!(self, DeliverySystem::DvbS | DeliverySystem::DvbS2)
    }

    /// Any DVB-C annex.
    pub fn is_cable(self) -> bool {
        matches!(
            self,
            DeliverySystem::DvbCAnnexA | DeliverySystem::DvbCAnnexB | DeliverySystem::DvbCAnnexC
        )
    }

    fn to_sys(self) -> u32 {
        match self {
            DeliverySystem::DvbT => sys::SYS_DVBT,
            DeliverySystem::DvbS => sys::SYS_DVBS,
            DeliverySystem::DvbS2 => sys::SYS_DVBS2,
            DeliverySystem::DvbCAnnexA => sys::SYS_DVBC_ANNEX_A,
            DeliverySystem::DvbCAnnexB => sys::SYS_DVBC_ANNEX_B,
            DeliverySystem::DvbCAnnexC => sys::SYS_DVBC_ANNEX_C,
        }
    }
}

impl FromStr for DeliverySystem {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t" => Ok(DeliverySystem::DvbT),
            "s" => Ok(DeliverySystem::DvbS),
            "s2" => Ok(DeliverySystem::DvbS2),
            "ca" => Ok(DeliverySystem::DvbCAnnexA),
            "cb" => Ok(DeliverySystem::DvbCAnnexB),
            "cc" => Ok(DeliverySystem::DvbCAnnexC),
            _ => Err(CaptureError::Usage(format!("unknown delivery system: {}", s))),
        }
    }
}

impl fmt::Display for DeliverySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliverySystem::DvbT => "DVB-T",
            DeliverySystem::DvbS => "DVB-S",
            DeliverySystem::DvbS2 => "DVB-S2",
            DeliverySystem::DvbCAnnexA => "DVB-C/A",
            DeliverySystem::DvbCAnnexB => "DVB-C/B",
            DeliverySystem::DvbCAnnexC => "DVB-C/C",
        };
        f.write_str(name)
    }
}

/// Satellite polarization; ignored for terrestrial and cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    /// `h`, 18 V
    Horizontal,
    /// `v`, 13 V
    Vertical,
}

impl FromStr for Polarization {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h" => Ok(Polarization::Horizontal),
            "v" => Ok(Polarization::Vertical),
            _ => Err(CaptureError::Usage(format!("unknown polarization: {}", s))),
        }
    }
}

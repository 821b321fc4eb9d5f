use super::sys::{self, DtvProperty};
use super::{DeliverySystem, Polarization};
use crate::error::{CaptureError, Result};
use log::{debug, info};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Universal Ku-band LNB
const LNB_BAND_START_HZ: i64 = 10_700_000_000;
const LNB_SWITCH_HZ: i64 = 11_700_000_000;
const LNB_LOW_LO_HZ: i64 = 9_750_000_000;
const LNB_HIGH_LO_HZ: i64 = 10_600_000_000;

/// Everything needed to tune a frontend to one multiplex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuneParams {
    /// Delivery system to switch the frontend to.
    pub system: DeliverySystem,
    /// Only used for satellite systems.
    pub polarization: Polarization,
    /// RF frequency. Satellite frequencies are converted to IF.
    pub frequency_hz: i64,
    /// 0 lets the driver detect the bandwidth.
    pub bandwidth_hz: u32,
    /// Satellite and cable only.
    pub symbol_rate_bd: u64,
}

impl TuneParams {
    /// Builds the DVBv5 property list for this multiplex, ending with `DTV_TUNE`.
    fn properties(&self) -> Result<Vec<DtvProperty>> {
        let mut props = vec![
            DtvProperty::new(sys::DTV_DELIVERY_SYSTEM, self.system.to_sys()),
            DtvProperty::new(sys::DTV_INVERSION, sys::INVERSION_AUTO),
        ];

        if self.system.is_satellite() {
            let (if_hz, tone) = lnb_downconvert(self.frequency_hz);
            let voltage = match self.polarization {
                Polarization::Horizontal => sys::SEC_VOLTAGE_18,
                Polarization::Vertical => sys::SEC_VOLTAGE_13,
            };
            // satellite frontends take the IF in kHz
            props.extend([
                DtvProperty::new(sys::DTV_FREQUENCY, to_u32("frequency", if_hz / 1_000)?),
                DtvProperty::new(sys::DTV_SYMBOL_RATE, to_u32("symbol rate", self.symbol_rate_bd)?),
                DtvProperty::new(sys::DTV_INNER_FEC, sys::FEC_AUTO),
                DtvProperty::new(sys::DTV_VOLTAGE, voltage),
                DtvProperty::new(sys::DTV_TONE, tone),
            ]);
            if self.system == DeliverySystem::DvbS2 {
                props.extend([
                    DtvProperty::new(sys::DTV_PILOT, sys::PILOT_AUTO),
                    DtvProperty::new(sys::DTV_ROLLOFF, sys::ROLLOFF_AUTO),
                ]);
            }
        } else if self.system.is_cable() {
            props.extend([
                DtvProperty::new(sys::DTV_FREQUENCY, to_u32("frequency", self.frequency_hz)?),
                DtvProperty::new(sys::DTV_MODULATION, sys::QAM_AUTO),
                DtvProperty::new(sys::DTV_SYMBOL_RATE, to_u32("symbol rate", self.symbol_rate_bd)?),
                DtvProperty::new(sys::DTV_INNER_FEC, sys::FEC_AUTO),
            ]);
        } else {
            props.extend([
                DtvProperty::new(sys::DTV_FREQUENCY, to_u32("frequency", self.frequency_hz)?),
                DtvProperty::new(sys::DTV_BANDWIDTH_HZ, self.bandwidth_hz),
                DtvProperty::new(sys::DTV_MODULATION, sys::QAM_AUTO),
                DtvProperty::new(sys::DTV_CODE_RATE_HP, sys::FEC_AUTO),
                DtvProperty::new(sys::DTV_CODE_RATE_LP, sys::FEC_AUTO),
                DtvProperty::new(sys::DTV_TRANSMISSION_MODE, sys::TRANSMISSION_MODE_AUTO),
                DtvProperty::new(sys::DTV_GUARD_INTERVAL, sys::GUARD_INTERVAL_AUTO),
                DtvProperty::new(sys::DTV_HIERARCHY, sys::HIERARCHY_AUTO),
            ]);
        }

        props.push(DtvProperty::new(sys::DTV_TUNE, 0));
        Ok(props)
    }
}

/// Returns the intermediate frequency and 22 kHz tone setting for a
/// downlink frequency. Frequencies below the Ku band are taken as an IF
/// already.
fn lnb_downconvert(frequency_hz: i64) -> (i64, u32) {
    if frequency_hz < LNB_BAND_START_HZ {
        (frequency_hz, sys::SEC_TONE_OFF)
    } else if frequency_hz < LNB_SWITCH_HZ {
        (frequency_hz - LNB_LOW_LO_HZ, sys::SEC_TONE_OFF)
    } else {
        (frequency_hz - LNB_HIGH_LO_HZ, sys::SEC_TONE_ON)
    }
}

fn to_u32<T: TryInto<u32> + Copy + fmt::Display>(what: &str, value: T) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| CaptureError::Tune(format!("{} {} out of range", what, value)))
}

/// Frontend status bits as reported by `FE_READ_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeStatus(pub u32);

impl FeStatus {
    /// The demodulator is locked and delivering packets.
    pub fn has_lock(self) -> bool {
        self.0 & sys::FE_HAS_LOCK != 0
    }
}

impl fmt::Display for FeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FLAGS: [(u32, &str); 6] = [
            (sys::FE_HAS_SIGNAL, "signal"),
            (sys::FE_HAS_CARRIER, "carrier"),
            (sys::FE_HAS_VITERBI, "viterbi"),
            (sys::FE_HAS_SYNC, "sync"),
            (sys::FE_HAS_LOCK, "lock"),
            (sys::FE_TIMEDOUT, "timedout"),
        ];
        let names: Vec<&str> = FLAGS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(" "))
        }
    }
}

/// An open, tuned frontend device. Closing it lets the driver power down.
#[derive(Debug)]
pub struct Frontend {
    file: File,
    path: PathBuf,
}

impl Frontend {
    /// Opens the frontend at `path` and starts tuning. Returns as soon as the
    /// driver accepted the parameters; use [`Frontend::wait_for_lock`] next.
    pub fn tune<P: AsRef<Path>>(path: P, params: &TuneParams) -> Result<Self> {
        let path = path.as_ref();
        let mut props = params.properties()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CaptureError::device(&format!("open {}", path.display()), e))?;
        let fd = file.as_raw_fd();

        let mut clear = [DtvProperty::new(sys::DTV_CLEAR, 0)];
        sys::set_properties(fd, &mut clear)
            .map_err(|e| CaptureError::Tune(format!("clear {}: {}", path.display(), e)))?;
        sys::set_properties(fd, &mut props)
            .map_err(|e| CaptureError::Tune(format!("tune {}: {}", path.display(), e)))?;

        info!(
            "Tuning {} to {} Hz ({}, {:?}, bw {} Hz, sr {} Bd)",
            path.display(),
            params.frequency_hz,
            params.system,
            params.polarization,
            params.bandwidth_hz,
            params.symbol_rate_bd
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Device path the frontend was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current status bits.
    pub fn status(&self) -> Result<FeStatus> {
        sys::read_status(self.file.as_raw_fd())
            .map(FeStatus)
            .map_err(|e| CaptureError::device("FE_READ_STATUS", e))
    }

    /// Polls the frontend until it reports lock or `deadline` passes.
    /// With `verbose` set, every status change is logged.
    pub async fn wait_for_lock(&self, deadline: Instant, verbose: bool) -> Result<FeStatus> {
        let started = Instant::now();
        let mut last = None;
        loop {
            let status = self.status()?;
            if last != Some(status) {
                if verbose {
                    info!("Frontend status: {}", status);
                } else {
                    debug!("Frontend status: {}", status);
                }
                last = Some(status);
            }
            if status.has_lock() {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::LockTimeout(started.elapsed()));
            }
            sleep(LOCK_POLL_INTERVAL).await;
        }
    }
}

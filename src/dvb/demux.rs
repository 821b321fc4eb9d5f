use super::sys::{self, DmxPesFilterParams};
use crate::error::{CaptureError, Result};
use crate::format::ts::PidSet;
use log::{debug, info, warn};
use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::path::Path;
use tokio::fs::File;

/// Kernel buffer large enough for a few hundred milliseconds of a full mux.
const DEMUX_BUFFER_SIZE: usize = 1024 * 1024;

/// Where the demux delivers filtered packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxOutput {
    /// To the DVR device, read separately.
    Dvr,
    /// To the filter descriptor itself.
    Filter,
}

impl DemuxOutput {
    fn to_sys(self) -> u32 {
        match self {
            DemuxOutput::Dvr => sys::DMX_OUT_TS_TAP,
            DemuxOutput::Filter => sys::DMX_OUT_TSDEMUX_TAP,
        }
    }
}

/// A started demux PES filter passing a set of PIDs.
///
/// The filter stays installed until [`DemuxFilter::release`] is called or the
/// value is dropped.
#[derive(Debug)]
pub struct DemuxFilter {
    file: File,
    released: bool,
}

impl DemuxFilter {
    /// Opens the demux device, installs a filter for `pids` and starts it.
    pub fn open<P: AsRef<Path>>(path: P, pids: &PidSet, output: DemuxOutput) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CaptureError::device(&format!("open {}", path.display()), e))?;
        let fd = file.as_raw_fd();

        sys::set_buffer_size(fd, DEMUX_BUFFER_SIZE)
            .map_err(|e| CaptureError::device("DMX_SET_BUFFER_SIZE", e))?;

        let mut pids_iter = pids.iter();
        // PidSet is never empty
        let first = pids_iter.next().unwrap_or_default();
        let params = DmxPesFilterParams {
            pid: first,
            input: sys::DMX_IN_FRONTEND,
            output: output.to_sys(),
            pes_type: sys::DMX_PES_OTHER,
            flags: 0,
        };
        sys::set_pes_filter(fd, &params)
            .map_err(|e| CaptureError::device(&format!("DMX_SET_PES_FILTER pid {}", first), e))?;
        for pid in pids_iter {
            sys::add_pid(fd, pid)
                .map_err(|e| CaptureError::device(&format!("DMX_ADD_PID pid {}", pid), e))?;
        }
        sys::start(fd).map_err(|e| CaptureError::device("DMX_START", e))?;

        info!(
            "Demux filter on {} started for PIDs {:?} ({:?} output)",
            path.display(),
            pids.as_slice(),
            output
        );
        Ok(Self {
            file: File::from_std(file),
            released: false,
        })
    }

    /// Packet stream of a [`DemuxOutput::Filter`] filter.
    pub fn reader(&mut self) -> &mut File {
        &mut self.file
    }

    /// Stops the filter. Safe to call more than once.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        sys::stop(self.file.as_raw_fd()).map_err(|e| CaptureError::device("DMX_STOP", e))?;
        debug!("Demux filter released");
        Ok(())
    }
}

impl Drop for DemuxFilter {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release demux filter: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let pids = PidSet::parse(["0"]).unwrap();
        let err = DemuxFilter::open("/nonexistent/demux0", &pids, DemuxOutput::Filter).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/demux0"));
    }

    #[test]
    fn test_output_mapping() {
        assert_eq!(DemuxOutput::Dvr.to_sys(), sys::DMX_OUT_TS_TAP);
        assert_eq!(DemuxOutput::Filter.to_sys(), sys::DMX_OUT_TSDEMUX_TAP);
    }
}

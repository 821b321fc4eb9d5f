//! Raw Linux DVB API (`linux/dvb/frontend.h`, `linux/dvb/dmx.h`).

#![allow(dead_code)]

use std::io;
use std::mem::size_of;
use std::os::fd::RawFd;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | ((b'o' as u32) << 8) | nr
}

// Frontend ioctls
pub const FE_READ_STATUS: u32 = ioc(IOC_READ, 69, size_of::<u32>());
pub const FE_SET_PROPERTY: u32 = ioc(IOC_WRITE, 82, size_of::<DtvProperties>());

// Demux ioctls
pub const DMX_START: u32 = ioc(IOC_NONE, 41, 0);
pub const DMX_STOP: u32 = ioc(IOC_NONE, 42, 0);
pub const DMX_SET_PES_FILTER: u32 = ioc(IOC_WRITE, 44, size_of::<DmxPesFilterParams>());
pub const DMX_SET_BUFFER_SIZE: u32 = ioc(IOC_NONE, 45, 0);
pub const DMX_ADD_PID: u32 = ioc(IOC_WRITE, 51, size_of::<u16>());

// fe_status
pub const FE_HAS_SIGNAL: u32 = 0x01;
pub const FE_HAS_CARRIER: u32 = 0x02;
pub const FE_HAS_VITERBI: u32 = 0x04;
pub const FE_HAS_SYNC: u32 = 0x08;
pub const FE_HAS_LOCK: u32 = 0x10;
pub const FE_TIMEDOUT: u32 = 0x20;

// DTV property commands
pub const DTV_TUNE: u32 = 1;
pub const DTV_CLEAR: u32 = 2;
pub const DTV_FREQUENCY: u32 = 3;
pub const DTV_MODULATION: u32 = 4;
pub const DTV_BANDWIDTH_HZ: u32 = 5;
pub const DTV_INVERSION: u32 = 6;
pub const DTV_SYMBOL_RATE: u32 = 8;
pub const DTV_INNER_FEC: u32 = 9;
pub const DTV_VOLTAGE: u32 = 10;
pub const DTV_TONE: u32 = 11;
pub const DTV_PILOT: u32 = 12;
pub const DTV_ROLLOFF: u32 = 13;
pub const DTV_DELIVERY_SYSTEM: u32 = 17;
pub const DTV_CODE_RATE_HP: u32 = 36;
pub const DTV_CODE_RATE_LP: u32 = 37;
pub const DTV_GUARD_INTERVAL: u32 = 38;
pub const DTV_TRANSMISSION_MODE: u32 = 39;
pub const DTV_HIERARCHY: u32 = 40;

// fe_delivery_system
pub const SYS_DVBC_ANNEX_A: u32 = 1;
pub const SYS_DVBC_ANNEX_B: u32 = 2;
pub const SYS_DVBT: u32 = 3;
pub const SYS_DVBS: u32 = 5;
pub const SYS_DVBS2: u32 = 6;
pub const SYS_DVBC_ANNEX_C: u32 = 18;

// "let the driver figure it out" values
pub const INVERSION_AUTO: u32 = 2;
pub const FEC_AUTO: u32 = 9;
pub const QAM_AUTO: u32 = 6;
pub const TRANSMISSION_MODE_AUTO: u32 = 2;
pub const GUARD_INTERVAL_AUTO: u32 = 3;
pub const HIERARCHY_AUTO: u32 = 4;
pub const PILOT_AUTO: u32 = 2;
pub const ROLLOFF_AUTO: u32 = 3;

// LNB control
pub const SEC_VOLTAGE_13: u32 = 0;
pub const SEC_VOLTAGE_18: u32 = 1;
pub const SEC_TONE_ON: u32 = 0;
pub const SEC_TONE_OFF: u32 = 1;

// dmx_input / dmx_output / dmx_ts_pes
pub const DMX_IN_FRONTEND: u32 = 0;
pub const DMX_OUT_TS_TAP: u32 = 2;
pub const DMX_OUT_TSDEMUX_TAP: u32 = 3;
pub const DMX_PES_OTHER: u32 = 20;

/// `struct dtv_property`, packed. Only the `data` member of the union is used;
/// the rest pads it to the size of its largest (buffer) member.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DtvProperty {
    pub cmd: u32,
    pub reserved: [u32; 3],
    pub data: u32,
    pub pad: [u8; 44 + size_of::<usize>()],
    pub result: i32,
}

impl DtvProperty {
    pub fn new(cmd: u32, data: u32) -> Self {
        Self {
            cmd,
            reserved: [0; 3],
            data,
            pad: [0; 44 + size_of::<usize>()],
            result: 0,
        }
    }
}

#[repr(C)]
pub struct DtvProperties {
    pub num: u32,
    pub props: *mut DtvProperty,
}

#[repr(C)]
pub struct DmxPesFilterParams {
    pub pid: u16,
    pub input: u32,
    pub output: u32,
    pub pes_type: u32,
    pub flags: u32,
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub fn read_status(fd: RawFd) -> io::Result<u32> {
    let mut status: u32 = 0;
    check(unsafe { libc::ioctl(fd, FE_READ_STATUS as _, &mut status as *mut u32) })?;
    Ok(status)
}

pub fn set_properties(fd: RawFd, props: &mut [DtvProperty]) -> io::Result<()> {
    let mut arg = DtvProperties {
        num: props.len() as u32,
        props: props.as_mut_ptr(),
    };
    check(unsafe { libc::ioctl(fd, FE_SET_PROPERTY as _, &mut arg as *mut DtvProperties) })
}

pub fn set_pes_filter(fd: RawFd, params: &DmxPesFilterParams) -> io::Result<()> {
    check(unsafe {
        libc::ioctl(
            fd,
            DMX_SET_PES_FILTER as _,
            params as *const DmxPesFilterParams,
        )
    })
}

pub fn add_pid(fd: RawFd, pid: u16) -> io::Result<()> {
    let mut pid = pid;
    check(unsafe { libc::ioctl(fd, DMX_ADD_PID as _, &mut pid as *mut u16) })
}

pub fn set_buffer_size(fd: RawFd, size: usize) -> io::Result<()> {
    check(unsafe { libc::ioctl(fd, DMX_SET_BUFFER_SIZE as _, size as libc::c_ulong) })
}

pub fn start(fd: RawFd) -> io::Result<()> {
    check(unsafe { libc::ioctl(fd, DMX_START as _) })
}

pub fn stop(fd: RawFd) -> io::Result<()> {
    check(unsafe { libc::ioctl(fd, DMX_STOP as _) })
}

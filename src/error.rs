use thiserror::Error;

/// Everything that can go wrong while setting up or running a capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// I/O on a file, socket or device descriptor.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad flag value or combination; the binary prints usage for it.
    #[error("usage error: {0}")]
    Usage(String),

    /// A PID argument that is not a number or is out of range.
    #[error("{token} isn't a valid PID: {reason}")]
    InvalidPid {
        /// The argument as given.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A listen or destination address that cannot be used.
    #[error("invalid address {addr:?}: {reason}")]
    InvalidAddress {
        /// The address as given.
        addr: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The frontend rejected the tuning parameters.
    #[error("tuning error: {0}")]
    Tune(String),

    /// No lock before the deadline.
    #[error("frontend not locked after {0:?}")]
    LockTimeout(std::time::Duration),

    /// Opening or configuring a DVB device failed.
    #[error("device error: {0}")]
    Device(String),

    /// A packet did not start with the sync byte.
    #[error("lost TS sync: expected 0x47, got {0:#04x}")]
    Sync(u8),

    /// Input ended or a datagram was cut in the middle of a packet.
    #[error("truncated TS packet: got {0} of 188 bytes")]
    TruncatedPacket(usize),
}

impl CaptureError {
    /// Wraps an OS error from a device ioctl with the operation that failed.
    pub(crate) fn device(op: &str, err: std::io::Error) -> Self {
        CaptureError::Device(format!("{}: {}", op, err))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CaptureError>;

//! Command line of the `dvbdd` binary.

use crate::config::ChannelConfig;
use crate::dvb::{DeliverySystem, Polarization, TuneParams};
use crate::error::{CaptureError, Result};
use crate::format::ts::PidSet;
use crate::pipeline::PacketCount;
use crate::sink::SinkSpec;
use crate::source::{RfParams, SourceKind, SourceSpec, LOCK_TIMEOUT};
use crate::utils::parse_int_auto;
use clap::Parser;
use log::warn;
use std::path::PathBuf;

/// Long options that may also be written with a single dash, `-count=5`.
const LONG_FLAGS: &[&str] = &[
    "src", "laddr", "front", "demux", "dvr", "sys", "channel", "conf", "pol", "count", "bw", "out",
    "verbose", "help", "version",
];

/// Flags and positional PIDs of `dvbdd`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "dvbdd",
    version,
    about = "Copy MPEG-TS packets from a DVB tuner or UDP to a file, UDP or nowhere",
    long_about = None,
    override_usage = "dvbdd [OPTION] PID [PID...]"
)]
pub struct Cli {
    /// source: rf, udp, mcast
    #[arg(long, default_value = "rf")]
    pub src: String,

    /// listen IP address and port or multicast GROUP:PORT@INTERFACE
    #[arg(long, default_value = "0.0.0.0:1234")]
    pub laddr: String,

    /// path to the frontend device
    #[arg(long, default_value = "/dev/dvb/adapter0/frontend0")]
    pub front: PathBuf,

    /// path to the demux device
    #[arg(long, default_value = "/dev/dvb/adapter0/demux0")]
    pub demux: PathBuf,

    /// path to the dvr device (default: read packets through the demux)
    #[arg(long, default_value = "")]
    pub dvr: String,

    /// delivery system type: t, s, s2, ca, cb, cc
    #[arg(long, default_value = "t")]
    pub sys: String,

    /// channel name
    #[arg(long, default_value = "")]
    pub channel: String,

    /// configuration file
    #[arg(long, default_value = "")]
    pub conf: String,

    /// polarization: h, v
    #[arg(long, default_value = "h")]
    pub pol: String,

    /// number of MPEG-TS packets to process (0 means infinity)
    #[arg(long, default_value = "0", value_parser = parse_unsigned)]
    pub count: u64,

    /// bandwidth [MHz] (0 means automatic)
    #[arg(long, default_value = "0", value_parser = parse_unsigned)]
    pub bw: u64,

    /// output to the specified file or UDP address and port (default: read and discard all packets)
    #[arg(long, default_value = "")]
    pub out: String,

    /// log frontend status while tuning and enable debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// PIDs to capture, 8192 for the whole stream
    #[arg(value_name = "PID", required = true, num_args = 1..)]
    pub pids: Vec<String>,
}

fn parse_unsigned(s: &str) -> std::result::Result<u64, String> {
    let value = parse_int_auto(s).map_err(|e| e.to_string())?;
    u64::try_from(value).map_err(|_| format!("{} is negative", s))
}

/// Rewrites Go-style `-flag` / `-flag=value` long options to `--flag`.
///
/// Arguments after `--` are left alone.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut end_of_flags = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || end_of_flags {
                return arg;
            }
            if arg == "--" {
                end_of_flags = true;
                return arg;
            }
            match arg.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
                    if LONG_FLAGS.contains(&name) {
                        format!("-{}", arg)
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

impl Cli {
    /// Parses process arguments, accepting single-dash long options.
    pub fn try_parse_normalized<I, S>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// The positional PIDs.
    pub fn pid_set(&self) -> Result<PidSet> {
        PidSet::parse(&self.pids)
    }

    /// `-count`, zero meaning unbounded.
    pub fn packet_count(&self) -> PacketCount {
        PacketCount::from(self.count)
    }

    /// Destination selected by `-out`.
    pub fn sink_spec(&self) -> SinkSpec {
        SinkSpec::parse(&self.out)
    }

    /// Picks the source from `-src`. For `rf` this reads the channel
    /// configuration to get frequency and symbol rate.
    pub fn source_spec(&self) -> Result<SourceSpec> {
        match self.src.parse::<SourceKind>()? {
            SourceKind::Udp => Ok(SourceSpec::Udp(self.laddr.clone())),
            SourceKind::Mcast => Ok(SourceSpec::Mcast(self.laddr.clone())),
            SourceKind::Rf => Ok(SourceSpec::Rf(self.rf_params()?)),
        }
    }

    fn rf_params(&self) -> Result<RfParams> {
        let system: DeliverySystem = self.sys.parse()?;
        let polarization: Polarization = self.pol.parse()?;
        let bandwidth_hz = self
            .bw
            .checked_mul(1_000_000)
            .and_then(|hz| u32::try_from(hz).ok())
            .ok_or_else(|| CaptureError::Usage(format!("bandwidth {} MHz out of range", self.bw)))?;

        let section = ChannelConfig::load(&self.conf, &self.channel);
        if section.is_empty() {
            warn!(
                "No tuning parameters for channel {:?} in {:?}",
                self.channel, self.conf
            );
        }

        Ok(RfParams {
            frontend: self.front.clone(),
            demux: self.demux.clone(),
            dvr: (!self.dvr.is_empty()).then(|| PathBuf::from(&self.dvr)),
            tune: TuneParams {
                system,
                polarization,
                frequency_hz: section.frequency_hz(),
                bandwidth_hz,
                symbol_rate_bd: section.symbol_rate_bd(),
            },
            lock_timeout: LOCK_TIMEOUT,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_normalized(std::iter::once("dvbdd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["256"]);
        assert_eq!(cli.src, "rf");
        assert_eq!(cli.laddr, "0.0.0.0:1234");
        assert_eq!(cli.front, PathBuf::from("/dev/dvb/adapter0/frontend0"));
        assert_eq!(cli.demux, PathBuf::from("/dev/dvb/adapter0/demux0"));
        assert_eq!(cli.dvr, "");
        assert_eq!(cli.sys, "t");
        assert_eq!(cli.pol, "h");
        assert_eq!(cli.count, 0);
        assert_eq!(cli.bw, 0);
        assert_eq!(cli.out, "");
        assert_eq!(cli.pids, vec!["256"]);
        assert_eq!(cli.packet_count(), PacketCount::Unbounded);
        assert_eq!(cli.sink_spec(), SinkSpec::Discard);
    }

    #[test]
    fn test_single_dash_long_flags() {
        let cli = parse(&["-src", "udp", "-count=0x10", "--out", "dump.ts", "-v", "0", "0x11"]);
        assert_eq!(cli.src, "udp");
        assert_eq!(cli.count, 16);
        assert_eq!(cli.out, "dump.ts");
        assert!(cli.verbose);
        assert_eq!(cli.pid_set().unwrap().as_slice(), &[0, 17]);
    }

    #[test]
    fn test_normalize_leaves_other_args() {
        assert_eq!(
            normalize_args(["dvbdd", "-src", "-x", "--", "-count", "17"]),
            vec!["dvbdd", "--src", "-x", "--", "-count", "17"]
        );
    }

    #[test]
    fn test_missing_pids_is_usage_error() {
        let err = Cli::try_parse_normalized(["dvbdd", "-src", "udp"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(err.use_stderr());
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(Cli::try_parse_normalized(["dvbdd", "--count=-1", "0"]).is_err());
    }

    #[test]
    fn test_udp_and_mcast_sources() {
        let cli = parse(&["-src", "mcast", "-laddr", "239.1.1.1:1234@eth0", "0"]);
        assert_eq!(cli.source_spec().unwrap(), SourceSpec::Mcast("239.1.1.1:1234@eth0".into()));
        let cli = parse(&["-src", "udp", "0"]);
        assert_eq!(cli.source_spec().unwrap(), SourceSpec::Udp("0.0.0.0:1234".into()));
    }

    #[test]
    fn test_unknown_source() {
        let cli = parse(&["-src", "http", "0"]);
        assert!(matches!(cli.source_spec(), Err(CaptureError::Usage(_))));
    }

    #[test]
    fn test_rf_params_from_config() {
        let mut conf = tempfile::NamedTempFile::new().unwrap();
        writeln!(conf, "[ZDF HD]\nFREQUENCY = 11361750000\nSYMBOL_RATE = 22000000").unwrap();
        let conf_path = conf.path().to_str().unwrap().to_string();

        let cli = parse(&[
            "-sys", "s2", "-pol", "v", "-channel", "ZDF HD", "-conf", &conf_path, "-bw", "8",
            "-dvr", "/dev/dvb/adapter0/dvr0", "0", "8192",
        ]);
        let SourceSpec::Rf(params) = cli.source_spec().unwrap() else {
            panic!("expected an RF source");
        };
        assert_eq!(
            params.tune,
            TuneParams {
                system: DeliverySystem::DvbS2,
                polarization: Polarization::Vertical,
                frequency_hz: 11_361_000_000,
                bandwidth_hz: 8_000_000,
                symbol_rate_bd: 22_000_000,
            }
        );
        assert_eq!(params.dvr, Some(PathBuf::from("/dev/dvb/adapter0/dvr0")));
        assert_eq!(params.lock_timeout, LOCK_TIMEOUT);
    }

    #[test]
    fn test_rf_rejects_bad_system() {
        let cli = parse(&["-sys", "t2", "0"]);
        assert!(matches!(cli.source_spec(), Err(CaptureError::Usage(_))));
        let cli = parse(&["-pol", "x", "0"]);
        assert!(matches!(cli.source_spec(), Err(CaptureError::Usage(_))));
    }
}

//! Channel configuration lookup.
//!
//! The configuration file is a list of INI-like sections, one per channel:
//!
//! ```text
//! [Das Erste HD]
//! FREQUENCY = 11493750000
//! SYMBOL_RATE = 22000000
//! DELIVERY_SYSTEM = DVBS2
//! ```
//!
//! Only `FREQUENCY` (Hz) and `SYMBOL_RATE` (Bd) are read, and only inside the
//! section whose name matches the requested channel.

use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const KEY_FREQUENCY: &str = "FREQUENCY";
const KEY_SYMBOL_RATE: &str = "SYMBOL_RATE";

/// Tuning parameters of one channel, stored in the units the tuner flags use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSection {
    /// Section name, as requested.
    pub name: String,
    /// Frequency in MHz, truncated.
    pub frequency_mhz: i64,
    /// Symbol rate in kBd, truncated.
    pub symbol_rate_kbd: u64,
}

impl ChannelSection {
    /// Frequency back in Hz, with the sub-MHz part dropped.
    pub fn frequency_hz(&self) -> i64 {
        self.frequency_mhz * 1_000_000
    }

    /// Symbol rate back in Bd.
    pub fn symbol_rate_bd(&self) -> u64 {
        self.symbol_rate_kbd * 1_000
    }

    /// True when nothing was found for the channel.
    pub fn is_empty(&self) -> bool {
        self.frequency_mhz == 0 && self.symbol_rate_kbd == 0
    }
}

/// Reader for the channel configuration file.
pub struct ChannelConfig;

impl ChannelConfig {
    /// Scans `reader` for the section named `channel`.
    ///
    /// Malformed numbers read as zero. A missing section or an empty
    /// channel name yields zeroed parameters. A duplicated section is
    /// applied in file order, so its last occurrence wins.
    pub fn parse<R: BufRead>(reader: R, channel: &str) -> ChannelSection {
        let mut section = ChannelSection {
            name: channel.to_string(),
            ..Default::default()
        };
        if channel.is_empty() {
            return section;
        }

        let mut in_target = false;
        for line in reader.split(b'\n') {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Stopped reading channel configuration: {}", e);
                    break;
                }
            };
            // legacy channel lists are often Latin-1
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if let Some(name) = section_header(line) {
                in_target = name == channel;
                continue;
            }
            if !in_target {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                KEY_FREQUENCY => {
                    section.frequency_mhz = value.parse::<i64>().unwrap_or(0) / 1_000_000;
                }
                KEY_SYMBOL_RATE => {
                    section.symbol_rate_kbd = value.parse::<u64>().unwrap_or(0) / 1_000;
                }
                _ => {}
            }
        }

        debug!(
            "Channel {:?}: {} MHz, {} kBd",
            channel, section.frequency_mhz, section.symbol_rate_kbd
        );
        section
    }

    /// Opens `path` and looks up `channel`. A file that cannot be opened
    /// yields zeroed parameters.
    pub fn load<P: AsRef<Path>>(path: P, channel: &str) -> ChannelSection {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::parse(BufReader::new(file), channel),
            Err(e) => {
                if !path.as_os_str().is_empty() {
                    warn!("Cannot open configuration {}: {}", path.display(), e);
                }
                ChannelSection {
                    name: channel.to_string(),
                    ..Default::default()
                }
            }
        }
    }
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

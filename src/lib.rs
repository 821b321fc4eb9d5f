#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

//! # dvbdd - transport stream capture
//!
//! `dvbdd` copies MPEG transport stream packets from one place to another,
//! unmodified, optionally keeping only a set of PIDs. Think `dd` for DVB.
//!
//! ## Sources
//! - a Linux DVB tuner (frontend + demux, optionally the DVR device), tuned
//!   from a channel configuration file
//! - a unicast UDP listener
//! - a multicast group joined on a given interface
//!
//! ## Sinks
//! - nowhere (read and discard, useful for testing reception)
//! - a file
//! - a UDP peer, one datagram per packet
//!
//! ## Example
//!
//! Forward PIDs 0 and 256 from a UDP stream into a file, stopping after
//! 1000 packets:
//!
//! ```rust,no_run
//! use dvbdd::format::ts::PidSet;
//! use dvbdd::pipeline::CapturePipeline;
//! use dvbdd::sink::SinkSpec;
//! use dvbdd::source::SourceSpec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pids = PidSet::parse(["0", "256"])?;
//!     let sink = SinkSpec::parse("capture.ts").open().await?;
//!     let source = SourceSpec::Udp("0.0.0.0:1234".into()).open(pids).await?;
//!
//!     let mut pipeline = CapturePipeline::new(source, sink, 1000u64);
//!     let summary = pipeline.run().await?;
//!     println!("forwarded {} packets", summary.packets);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `config`: channel lookup in the INI-like configuration file
//! - `format`: the TS packet container, reader/writer traits, UDP transport
//! - `dvb`: Linux DVB frontend and demux wrappers
//! - `source` / `sink`: selection of the packet producer and consumer
//! - `pipeline`: the read-write loop
//! - `cli`: command line of the `dvbdd` binary
//! - `error`: error type and result alias

/// Command line parsing
pub mod cli;

/// Channel configuration file
pub mod config;

/// Linux DVB devices
pub mod dvb;

/// Error types and utilities
pub mod error;

/// Packet container and transports
pub mod format;

/// Capture loop
pub mod pipeline;

/// Packet consumers
pub mod sink;

/// Packet producers
pub mod source;

/// Common utilities and helper functions
pub mod utils;

pub use error::{CaptureError, Result};

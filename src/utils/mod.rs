//! # Utility Functions
//!
//! Small helpers shared by the command line and the configuration layer.
//!
//! ## Numeric literals
//!
//! [`parse_int_auto`] accepts integers in any of the usual textual bases:
//!
//! ```rust
//! use dvbdd::utils::parse_int_auto;
//!
//! assert_eq!(parse_int_auto("256").unwrap(), 256);
//! assert_eq!(parse_int_auto("0x100").unwrap(), 256);
//! assert_eq!(parse_int_auto("0400").unwrap(), 256);
//! assert_eq!(parse_int_auto("0b1_0000_0000").unwrap(), 256);
//! ```

/// Base-detecting integer parser
pub mod num;

pub use num::parse_int_auto;

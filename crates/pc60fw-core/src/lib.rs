//! Core PC-60FW primitives shared across crates.
//!
//! Includes the vitals record, the fixed-point perfusion index, the
//! CRC-8/MAXIM frame checksum, and base errors.

pub mod checksum;
pub mod error;
pub mod types;

pub use checksum::{crc8_maxim, crc8_maxim_residue_ok};
pub use error::CoreError;
pub use types::{PerfusionIndex, VitalsSample};

use std::time::SystemTime;

use pc60fw_core::{PerfusionIndex, VitalsSample};
use tracing::debug;

use crate::error::CodecError;
use crate::frame::DecodedMessage;

/// Type code of the display-update report carrying vitals.
pub const TYPE_VITALS_REPORT: u8 = 0x01;

const SPO2_OFFSET: usize = 1;
const PULSE_RATE_OFFSET: usize = 2;
const PERFUSION_INDEX_OFFSET: usize = 4;
const VITALS_REPORT_MIN_LEN: usize = PERFUSION_INDEX_OFFSET + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Values currently shown on the device display.
    VitalsReport,
    /// Any other report kind; ignored.
    Unrecognized(u8),
    /// Zero-length payload with no type code.
    Empty,
}

impl MessageType {
    pub fn of(message: &DecodedMessage) -> Self {
        match message.type_code() {
            Some(TYPE_VITALS_REPORT) => Self::VitalsReport,
            Some(other) => Self::Unrecognized(other),
            None => Self::Empty,
        }
    }
}

/// Maps a decoded message to a vitals sample stamped with the current time.
pub fn interpret(message: &DecodedMessage) -> Option<VitalsSample> {
    interpret_at(message, SystemTime::now())
}

/// Maps a decoded message to a vitals sample stamped with `at`.
///
/// Only vitals reports produce a sample. Field values are passed through
/// unvalidated.
pub fn interpret_at(message: &DecodedMessage, at: SystemTime) -> Option<VitalsSample> {
    match MessageType::of(message) {
        MessageType::VitalsReport => match parse_vitals(&message.payload, at) {
            Ok(sample) => Some(sample),
            Err(err) => {
                debug!(%err, "ignoring vitals report");
                None
            }
        },
        MessageType::Unrecognized(_) | MessageType::Empty => None,
    }
}

fn parse_vitals(payload: &[u8], at: SystemTime) -> Result<VitalsSample, CodecError> {
    if payload.len() < VITALS_REPORT_MIN_LEN {
        return Err(CodecError::ShortVitalsReport(payload.len()));
    }
    Ok(VitalsSample::new(
        at,
        payload[SPO2_OFFSET],
        payload[PULSE_RATE_OFFSET],
        PerfusionIndex::from_tenths(payload[PERFUSION_INDEX_OFFSET]),
    ))
}

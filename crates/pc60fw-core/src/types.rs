use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CoreError;

/// Perfusion index in fixed-point tenths, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PerfusionIndex(pub u8);

impl PerfusionIndex {
    pub fn from_tenths(raw: u8) -> Self {
        Self(raw)
    }

    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for PerfusionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// One vitals reading taken from a display-update report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitalsSample {
    pub timestamp: SystemTime,
    pub spo2_percent: u8,
    pub pulse_rate_bpm: u8,
    pub perfusion_index: PerfusionIndex,
}

impl VitalsSample {
    pub fn new(
        timestamp: SystemTime,
        spo2_percent: u8,
        pulse_rate_bpm: u8,
        perfusion_index: PerfusionIndex,
    ) -> Self {
        Self {
            timestamp,
            spo2_percent,
            pulse_rate_bpm,
            perfusion_index,
        }
    }

    /// Whole seconds since the Unix epoch (sub-second part truncated).
    pub fn unix_seconds(&self) -> Result<u64, CoreError> {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .map_err(|_| CoreError::TimestampBeforeEpoch)
    }
}

impl fmt::Display for VitalsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpO2: {} PR: {} PI: {}",
            self.spo2_percent, self.pulse_rate_bpm, self.perfusion_index
        )
    }
}

use pc60fw_core::crc8_maxim;

/// Outbound commands understood by the oximeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Asks the device to start streaming reports. Sent without a checksum
    /// trailer, exactly as the vendor sequence is observed on the wire.
    EnableNotifications,
    /// Sets the display brightness level.
    SetBrightness(u8),
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::EnableNotifications => vec![0xAA, 0x55, 0x0F, 0x84, 0x01],
            Self::SetBrightness(level) => {
                let mut out = vec![0xAA, 0x55, 0xF0, 0x03, 0x85, *level];
                out.push(crc8_maxim(&out));
                out
            }
        }
    }
}

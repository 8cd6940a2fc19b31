/// Reflected form of the CRC-8/MAXIM polynomial `0x31`.
const POLY_REFLECTED: u8 = 0x8C;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Computes CRC-8/MAXIM (poly 0x31, reflected in/out, init 0x00, xorout 0x00).
pub fn crc8_maxim(input: &[u8]) -> u8 {
    input
        .iter()
        .fold(0u8, |crc, &byte| TABLE[(crc ^ byte) as usize])
}

/// Returns true when `frame` ends with its own CRC-8/MAXIM trailer.
///
/// Running the CRC over the payload plus its appended checksum leaves a zero
/// residue for an intact frame.
pub fn crc8_maxim_residue_ok(frame: &[u8]) -> bool {
    crc8_maxim(frame) == 0
}

#[cfg(test)]
mod tests {
    use super::{crc8_maxim, crc8_maxim_residue_ok};

    #[test]
    fn matches_catalogue_check_value() {
        assert_eq!(crc8_maxim(b"123456789"), 0xA1);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc8_maxim(&[]), 0x00);
    }

    #[test]
    fn appended_checksum_yields_zero_residue() {
        let mut frame = vec![0xAA, 0x55, 0x00, 0x05, 0x01, 0x62, 0x4B, 0x00, 0x0A];
        let crc = crc8_maxim(&frame);
        assert_eq!(crc, 0xB8);
        frame.push(crc);
        assert!(crc8_maxim_residue_ok(&frame));

        frame[5] ^= 0x01;
        assert!(!crc8_maxim_residue_ok(&frame));
    }
}

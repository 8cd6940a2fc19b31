use bytes::Bytes;
use pc60fw_core::{crc8_maxim, crc8_maxim_residue_ok};

use crate::error::CodecError;

/// Two-byte marker that opens every frame.
pub const SYNC: [u8; 2] = [0xAA, 0x55];
/// Offset of the reserved/length-context byte.
pub const CONTEXT_OFFSET: usize = 2;
/// Offset of the payload length byte.
pub const LENGTH_OFFSET: usize = 3;
/// Sync marker, context byte and length byte.
pub const FRAME_HEADER_LEN: usize = 4;
pub const CHECKSUM_LEN: usize = 1;

/// Total on-wire size of a frame carrying `payload_len` payload bytes.
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_LEN + payload_len + CHECKSUM_LEN
}

/// Frame contents with the sync marker and checksum trailer stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Reserved byte following the sync marker.
    pub context: u8,
    /// Payload length as announced on the wire.
    pub length: u8,
    pub payload: Bytes,
    /// Whether the CRC-8/MAXIM residue over the whole frame was zero.
    pub checksum_ok: bool,
}

impl DecodedMessage {
    /// Builds a message from a frame already known to be exactly
    /// `frame_len(frame[LENGTH_OFFSET])` bytes long.
    pub(crate) fn from_complete_frame(frame: Bytes) -> Self {
        let checksum_ok = crc8_maxim_residue_ok(&frame);
        let context = frame[CONTEXT_OFFSET];
        let length = frame[LENGTH_OFFSET];
        let end = FRAME_HEADER_LEN + length as usize;
        Self {
            context,
            length,
            payload: frame.slice(FRAME_HEADER_LEN..end),
            checksum_ok,
        }
    }

    /// First payload byte, identifying the report kind.
    pub fn type_code(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Encodes a frame around `payload`, appending its CRC-8/MAXIM trailer.
pub fn encode_frame(context: u8, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let length =
        u8::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLong(payload.len()))?;
    let mut out = Vec::with_capacity(frame_len(payload.len()));
    out.extend_from_slice(&SYNC);
    out.push(context);
    out.push(length);
    out.extend_from_slice(payload);
    out.push(crc8_maxim(&out));
    Ok(out)
}

/// Decodes exactly one complete frame.
///
/// Unlike [`crate::FrameDecoder`], this does not search for the sync marker
/// and rejects short or over-long input instead of waiting for more bytes.
/// A checksum mismatch is reported through [`DecodedMessage::checksum_ok`].
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedMessage, CodecError> {
    if bytes.len() < SYNC.len() || bytes[..SYNC.len()] != SYNC {
        return Err(CodecError::MissingSync);
    }
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(CodecError::Truncated {
            need: FRAME_HEADER_LEN,
            have: bytes.len(),
        });
    }
    let expected = frame_len(bytes[LENGTH_OFFSET] as usize);
    if bytes.len() < expected {
        return Err(CodecError::Truncated {
            need: expected,
            have: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(CodecError::TrailingBytes {
            expected,
            got: bytes.len(),
        });
    }
    Ok(DecodedMessage::from_complete_frame(Bytes::copy_from_slice(
        bytes,
    )))
}

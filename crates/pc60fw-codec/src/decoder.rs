use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::frame::{frame_len, DecodedMessage, FRAME_HEADER_LEN, LENGTH_OFFSET, SYNC};

/// Coarse decoder counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub bytes_discarded: u64,
    pub buffered: usize,
}

/// Stateful reassembler for the sync-delimited notification stream.
///
/// Bytes accumulate until a complete frame is available after the first sync
/// marker. Noise ahead of the marker is dropped only once that frame is
/// extracted. No cap is placed on the buffer: a stream that never carries
/// `AA 55` grows it without bound.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every frame that became complete, in
    /// arrival order.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<DecodedMessage> {
        self.buffer.extend_from_slice(chunk);
        let mut messages = Vec::new();
        while let Some(message) = self.next_message() {
            messages.push(message);
        }
        messages
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            buffered: self.buffer.len(),
            ..self.stats
        }
    }

    fn next_message(&mut self) -> Option<DecodedMessage> {
        if self.buffer.is_empty() {
            return None;
        }
        let idx = find_sync(&self.buffer)?;
        if self.buffer.len() < idx + FRAME_HEADER_LEN {
            return None;
        }
        let length = self.buffer[idx + LENGTH_OFFSET] as usize;
        let total = frame_len(length);
        if self.buffer.len() < idx + total {
            return None;
        }

        if idx > 0 {
            debug!(discarded = idx, "dropping bytes ahead of sync marker");
            self.buffer.advance(idx);
            self.stats.bytes_discarded += idx as u64;
        }

        let frame = self.buffer.split_to(total).freeze();
        debug!(frame = %hex::encode(&frame), "frame");
        let message = DecodedMessage::from_complete_frame(frame);
        if !message.checksum_ok {
            warn!(
                context = message.context,
                length = message.length,
                "CRC error"
            );
            self.stats.checksum_failures += 1;
        }
        self.stats.frames_decoded += 1;
        Some(message)
    }
}

fn find_sync(buffer: &[u8]) -> Option<usize> {
    buffer.windows(SYNC.len()).position(|window| window == SYNC)
}

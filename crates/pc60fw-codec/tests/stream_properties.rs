use pc60fw_codec::{encode_frame, interpret, DecodedMessage, FrameDecoder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn vitals_frame(spo2: u8, pulse: u8, pi: u8) -> Vec<u8> {
    encode_frame(0x00, &[0x01, spo2, pulse, 0x00, pi]).expect("frame should encode")
}

fn feed_in_chunks(bytes: &[u8], bounds: &[usize]) -> Vec<DecodedMessage> {
    let mut decoder = FrameDecoder::new();
    let mut out = Vec::new();
    let mut start = 0;
    for &end in bounds {
        out.extend(decoder.ingest(&bytes[start..end]));
        start = end;
    }
    out.extend(decoder.ingest(&bytes[start..]));
    out
}

#[test]
fn no_message_until_frame_is_complete() {
    for payload_len in [0usize, 1, 5, 17, 255] {
        let payload: Vec<u8> = (0..payload_len).map(|i| i as u8).collect();
        let frame = encode_frame(0x0F, &payload).expect("frame should encode");
        let mut decoder = FrameDecoder::new();
        let prefix = [0x10, 0x20, 0x30];
        assert!(decoder.ingest(&prefix).is_empty());
        for (i, byte) in frame[..frame.len() - 1].iter().enumerate() {
            assert!(decoder.ingest(&[*byte]).is_empty());
            assert_eq!(decoder.buffered_len(), prefix.len() + i + 1);
        }
        let messages = decoder.ingest(&frame[frame.len() - 1..]);
        assert_eq!(messages.len(), 1, "payload_len {payload_len}");
        assert_eq!(messages[0].payload, payload);
        assert_eq!(decoder.buffered_len(), 0);
    }
}

#[test]
fn fragmentation_does_not_change_result() {
    let frame = vitals_frame(98, 75, 10);
    let whole = feed_in_chunks(&frame, &[]);
    assert_eq!(whole.len(), 1);

    let single_bytes: Vec<usize> = (1..frame.len()).collect();
    assert_eq!(feed_in_chunks(&frame, &single_bytes), whole);

    let mut rng = StdRng::seed_from_u64(0x0C60_F00D);
    for _ in 0..500 {
        let mut bounds: Vec<usize> = (0..rng.gen_range(1..6))
            .map(|_| rng.gen_range(0..=frame.len()))
            .collect();
        bounds.sort_unstable();
        assert_eq!(feed_in_chunks(&frame, &bounds), whole, "bounds {bounds:?}");
    }
}

#[test]
fn garbage_prefix_does_not_block_decode() {
    let frame = vitals_frame(97, 64, 23);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let mut garbage: Vec<u8> = (0..rng.gen_range(0..40)).map(|_| rng.gen()).collect();
        // Strip anything that could read as a sync marker.
        for byte in garbage.iter_mut() {
            if *byte == 0xAA {
                *byte = 0xAB;
            }
        }
        let mut decoder = FrameDecoder::new();
        assert!(decoder.ingest(&garbage).is_empty());
        let messages = decoder.ingest(&frame);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].checksum_ok);
        assert_eq!(decoder.stats().bytes_discarded, garbage.len() as u64);
        assert_eq!(decoder.buffered_len(), 0);
    }
}

#[test]
fn corrupted_checksum_still_reports_sample() {
    let mut frame = vitals_frame(98, 75, 10);
    let last = frame.len() - 1;
    frame[last] = frame[last].wrapping_add(1);

    let mut decoder = FrameDecoder::new();
    let messages = decoder.ingest(&frame);
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].checksum_ok);
    assert_eq!(decoder.stats().checksum_failures, 1);

    let sample = interpret(&messages[0]).expect("sample despite checksum mismatch");
    assert_eq!(sample.spo2_percent, 98);
    assert_eq!(sample.pulse_rate_bpm, 75);
}

#[test]
fn unknown_type_code_yields_nothing() {
    let frame = encode_frame(0x0F, &[0x02, 0x40, 0x41, 0x42]).expect("frame should encode");
    let mut decoder = FrameDecoder::new();
    let messages = decoder.ingest(&frame);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].checksum_ok);
    assert!(interpret(&messages[0]).is_none());
}

#[test]
fn back_to_back_frames_decode_in_order() {
    let first = vitals_frame(98, 75, 10);
    let second = vitals_frame(95, 80, 31);
    let mut batch = first.clone();
    batch.extend_from_slice(&second);

    let mut decoder = FrameDecoder::new();
    let messages = decoder.ingest(&batch);
    assert_eq!(messages.len(), 2);
    assert_eq!(interpret(&messages[0]).map(|s| s.spo2_percent), Some(98));
    assert_eq!(interpret(&messages[1]).map(|s| s.spo2_percent), Some(95));
    assert_eq!(decoder.stats().frames_decoded, 2);
}

#[test]
fn noise_between_frames_is_skipped() {
    let mut stream = vitals_frame(98, 75, 10);
    stream.extend_from_slice(&[0x00, 0x55, 0x13]);
    stream.extend_from_slice(&vitals_frame(96, 70, 5));

    let mut decoder = FrameDecoder::new();
    let messages = decoder.ingest(&stream);
    assert_eq!(messages.len(), 2);
    assert_eq!(decoder.stats().bytes_discarded, 3);
}

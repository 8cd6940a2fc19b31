use pc60fw_codec::encode_frame;
use pc60fw_node::config::SessionConfig;
use pc60fw_node::replay::{load_capture, replay_capture};
use pc60fw_node::session::{Session, ShutdownReason};
use pc60fw_node::sink::{MemorySink, TsvFileSink};
use pc60fw_transport_ble::{LinkError, MockPeripheralLink};

const VITALS_FRAME: [u8; 10] = [
    0xAA, 0x55, 0x00, 0x05, 0x01, 0x62, 0x4B, 0x00, 0x0A, 0xB8,
];

fn parse_log_line(line: &str) -> (u64, u8, u8, String) {
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields.len(), 4, "unexpected log line {line:?}");
    (
        fields[0].parse().expect("timestamp"),
        fields[1].parse().expect("spo2"),
        fields[2].parse().expect("pulse"),
        fields[3].to_string(),
    )
}

#[tokio::test]
async fn vitals_frame_reaches_durable_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pc60fw.log");
    let sink = TsvFileSink::open(&path).expect("open sink");

    let mut session = Session::new(sink);
    let (mut link, mut events) = session
        .connect_with(async { Ok::<_, LinkError>(MockPeripheralLink::connect("e2e", 8)) })
        .await
        .expect("connect");
    link.notify(VITALS_FRAME.to_vec()).expect("notify");
    link.disconnect().expect("disconnect");

    let summary = session.run(&mut events).await.expect("run");
    assert_eq!(summary.reason, ShutdownReason::PeripheralDisconnected);
    assert_eq!(summary.samples_recorded, 1);
    assert_eq!(summary.decoder.checksum_failures, 0);

    let contents = std::fs::read_to_string(&path).expect("read log");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let (timestamp, spo2, pulse, pi) = parse_log_line(lines[0]);
    assert!(timestamp > 1_600_000_000);
    assert_eq!((spo2, pulse, pi.as_str()), (98, 75, "1.0"));
    assert!(contents.ends_with('\n'));
}

#[tokio::test]
async fn corrupted_checksum_is_still_logged() {
    let mut frame = VITALS_FRAME;
    frame[9] = 0x00;

    let (summary, sink) = replay_capture(
        vec![frame.to_vec()],
        MemorySink::default(),
        &SessionConfig::default(),
    )
    .await
    .expect("replay");
    assert_eq!(summary.decoder.checksum_failures, 1);
    assert_eq!(sink.samples.len(), 1);
    assert_eq!(sink.samples[0].spo2_percent, 98);
}

#[tokio::test]
async fn replayed_capture_file_matches_live_feed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let capture = dir.path().join("capture.hex");
    let second = encode_frame(0x0F, &[0x01, 0x60, 0x50, 0x00, 0x21, 0x00, 0x00, 0xC0])
        .expect("encode");
    let waveform = encode_frame(0x0F, &[0x02, 0x10, 0x20, 0x30]).expect("encode");

    let mut stream = VITALS_FRAME.to_vec();
    stream.extend_from_slice(&waveform);
    stream.extend_from_slice(&second);
    let mut text = String::from("# three frames, split at odd offsets\n");
    for chunk in stream.chunks(7) {
        text.push_str(&hex::encode(chunk));
        text.push('\n');
    }
    std::fs::write(&capture, text).expect("write capture");

    let log_path = dir.path().join("vitals.log");
    let chunks = load_capture(&capture).expect("load capture");
    let config = SessionConfig {
        event_queue_capacity: 2,
        ..SessionConfig::default()
    };
    let sink = TsvFileSink::open(&log_path).expect("open");
    let (summary, _sink) = replay_capture(chunks, sink, &config)
        .await
        .expect("replay");
    assert_eq!(summary.decoder.frames_decoded, 3);
    assert_eq!(summary.samples_recorded, 2);

    let contents = std::fs::read_to_string(&log_path).expect("read log");
    let values: Vec<(u8, u8, String)> = contents
        .lines()
        .map(|line| {
            let (_, spo2, pulse, pi) = parse_log_line(line);
            (spo2, pulse, pi)
        })
        .collect();
    assert_eq!(
        values,
        vec![(98, 75, "1.0".to_string()), (96, 80, "3.3".to_string())]
    );
}

//! Feeds a recorded notification capture through a live session.
//!
//! A capture holds one notification per line as hex. Blank lines and `#`
//! comments are skipped, and only the last whitespace-separated token of a
//! line is read, so `chunk=<hex>` debug log lines can be replayed directly.

use std::path::Path;

use pc60fw_transport_ble::{LinkError, LinkEvent, MockPeripheralLink};
use thiserror::Error;
use tracing::info;

use crate::config::SessionConfig;
use crate::session::{Session, SessionError, SessionSummary};
use crate::sink::VitalsSink;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read capture: {0}")]
    Read(#[from] std::io::Error),
    #[error("line {line}: invalid hex: {source}")]
    Hex {
        line: usize,
        source: hex::FromHexError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub fn parse_capture(text: &str) -> Result<Vec<Vec<u8>>, ReplayError> {
    let mut chunks = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let token = line.split_whitespace().last().unwrap_or(line);
        let token = token.rsplit('=').next().unwrap_or(token);
        let chunk = hex::decode(token).map_err(|source| ReplayError::Hex {
            line: idx + 1,
            source,
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

pub fn load_capture(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>, ReplayError> {
    let text = std::fs::read_to_string(path)?;
    parse_capture(&text)
}

/// Replays `chunks` as notifications followed by a disconnect and returns
/// the session summary together with the sink.
pub async fn replay_capture<S: VitalsSink>(
    chunks: Vec<Vec<u8>>,
    sink: S,
    config: &SessionConfig,
) -> Result<(SessionSummary, S), ReplayError> {
    let mut session = Session::new(sink);
    let capacity = config.event_queue_capacity;
    let (mut link, mut events) = session
        .connect_with(async {
            Ok::<_, LinkError>(MockPeripheralLink::connect("replay", capacity))
        })
        .await?;
    session.send_startup_commands(&mut link, config)?;

    info!(chunks = chunks.len(), "replaying capture");
    let sender = link.event_sender();
    let feed = async move {
        for chunk in chunks {
            if sender.send(LinkEvent::Notification(chunk)).await.is_err() {
                return;
            }
        }
        let _ = sender.send(LinkEvent::Disconnected).await;
    };
    tokio::pin!(feed);
    // The session may stop early (sink failure); the feeder is abandoned then.
    let summary = {
        let run = session.run(&mut events);
        tokio::pin!(run);
        let mut fed = false;
        loop {
            tokio::select! {
                result = &mut run => break result?,
                _ = &mut feed, if !fed => fed = true,
            }
        }
    };
    Ok((summary, session.into_sink()))
}

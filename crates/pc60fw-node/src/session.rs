use std::fmt;
use std::future::Future;

use pc60fw_codec::{interpret, DecoderStats, FrameDecoder};
use pc60fw_transport_ble::{LinkEvent, PeripheralLink};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::sink::{SinkError, VitalsSink};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Connected with the notify characteristic subscribed.
    Subscribed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

/// Whether the event loop should keep consuming events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The peripheral signalled a disconnect.
    PeripheralDisconnected,
    /// The transport dropped its end of the event queue.
    EventQueueClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: ShutdownReason,
    pub samples_recorded: u64,
    pub decoder: DecoderStats,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
    #[error("session is not subscribed (state: {0})")]
    NotSubscribed(SessionState),
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),
    #[error("command write failed: {0}")]
    Command(#[source] BoxError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Single-consumer session: owns the decoder and the sink.
#[derive(Debug)]
pub struct Session<S> {
    state: SessionState,
    decoder: FrameDecoder,
    sink: S,
    samples_recorded: u64,
}

impl<S: VitalsSink> Session<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: SessionState::Disconnected,
            decoder: FrameDecoder::new(),
            sink,
            samples_recorded: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    fn ensure_subscribed(&self) -> Result<(), SessionError> {
        if self.state != SessionState::Subscribed {
            return Err(SessionError::NotSubscribed(self.state));
        }
        Ok(())
    }

    fn transition(&mut self, to: SessionState) -> Result<(), SessionError> {
        use SessionState::*;
        let allowed = matches!(
            (self.state, to),
            (Disconnected, Connecting)
                | (Connecting, Subscribed)
                | (Connecting, Disconnected)
                | (Subscribed, Disconnected)
        );
        if !allowed {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        info!(from = %self.state, to = %to, "session state");
        self.state = to;
        Ok(())
    }

    /// Drives `Disconnected -> Connecting -> Subscribed` around the
    /// transport's connect future. A connect failure returns the session to
    /// `Disconnected` and is not retried.
    pub async fn connect_with<L, E, F>(
        &mut self,
        connecting: F,
    ) -> Result<(L, mpsc::Receiver<LinkEvent>), SessionError>
    where
        L: PeripheralLink,
        E: std::error::Error + Send + Sync + 'static,
        F: Future<Output = Result<(L, mpsc::Receiver<LinkEvent>), E>>,
    {
        self.transition(SessionState::Connecting)?;
        match connecting.await {
            Ok((link, events)) => {
                self.transition(SessionState::Subscribed)?;
                info!(device = link.address(), "subscribed to notifications");
                Ok((link, events))
            }
            Err(err) => {
                self.transition(SessionState::Disconnected)?;
                Err(SessionError::Connect(Box::new(err)))
            }
        }
    }

    /// Sends the configured startup commands over `link`.
    pub fn send_startup_commands<L: PeripheralLink>(
        &self,
        link: &mut L,
        config: &SessionConfig,
    ) -> Result<(), SessionError> {
        self.ensure_subscribed()?;
        for command in config.startup_commands() {
            debug!(?command, "sending command");
            link.send_command(&command.encode())
                .map_err(|err| SessionError::Command(Box::new(err)))?;
        }
        Ok(())
    }

    /// Handles one transport event.
    pub fn handle_event(&mut self, event: LinkEvent) -> Result<SessionFlow, SessionError> {
        self.ensure_subscribed()?;
        match event {
            LinkEvent::Notification(chunk) => {
                self.handle_notification(&chunk)?;
                Ok(SessionFlow::Continue)
            }
            LinkEvent::Disconnected => {
                self.transition(SessionState::Disconnected)?;
                Ok(SessionFlow::Shutdown)
            }
        }
    }

    /// Feeds one notification through the decoder and records any samples.
    /// Returns how many samples were recorded.
    pub fn handle_notification(&mut self, chunk: &[u8]) -> Result<usize, SessionError> {
        self.ensure_subscribed()?;
        debug!(chunk = %hex::encode(chunk), "notification");
        let mut recorded = 0;
        for message in self.decoder.ingest(chunk) {
            let Some(sample) = interpret(&message) else {
                continue;
            };
            self.sink.record(&sample).map_err(|err| {
                error!(%err, "vitals sink failed");
                err
            })?;
            self.samples_recorded += 1;
            recorded += 1;
        }
        Ok(recorded)
    }

    /// Consumes events sequentially until the peripheral disconnects or the
    /// queue closes. Nothing is decoded after shutdown.
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<LinkEvent>,
    ) -> Result<SessionSummary, SessionError> {
        let reason = loop {
            let Some(event) = events.recv().await else {
                warn!("event queue closed");
                if self.state == SessionState::Subscribed {
                    self.transition(SessionState::Disconnected)?;
                }
                break ShutdownReason::EventQueueClosed;
            };
            if self.handle_event(event)? == SessionFlow::Shutdown {
                break ShutdownReason::PeripheralDisconnected;
            }
        };
        let summary = SessionSummary {
            reason,
            samples_recorded: self.samples_recorded,
            decoder: self.decoder.stats(),
        };
        info!(
            samples = summary.samples_recorded,
            frames = summary.decoder.frames_decoded,
            crc_errors = summary.decoder.checksum_failures,
            "session ended"
        );
        Ok(summary)
    }
}

//! Bluetooth LE link to the PC-60FW pulse oximeter.
//!
//! A connected link delivers [`LinkEvent`]s over a tokio channel and accepts
//! outbound command bytes through [`PeripheralLink`]. Enable the `btleplug`
//! feature for the hardware backend; [`MockPeripheralLink`] stands in for it
//! in tests and replays.

use thiserror::Error;
use tokio::sync::mpsc;

#[cfg(feature = "btleplug")]
pub mod btleplug_backend;
pub mod protocol;

/// Events pushed from the transport to the session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Raw bytes of one characteristic notification.
    Notification(Vec<u8>),
    /// The peripheral dropped the connection.
    Disconnected,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link is closed")]
    Closed,
    #[error("event queue is full")]
    QueueFull,
}

/// Minimal connected-peripheral abstraction used by the session.
pub trait PeripheralLink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Address of the connected peripheral.
    fn address(&self) -> &str;
    /// Queues `command` for delivery to the write characteristic.
    fn send_command(&mut self, command: &[u8]) -> Result<(), Self::Error>;
}

/// In-memory link for tests and capture replays.
#[derive(Debug)]
pub struct MockPeripheralLink {
    address: String,
    events_tx: mpsc::Sender<LinkEvent>,
    outbound: Vec<Vec<u8>>,
    closed: bool,
}

impl MockPeripheralLink {
    /// Creates a connected mock link and the receiving end of its event queue.
    pub fn connect(
        address: impl Into<String>,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (events_tx, events_rx) = mpsc::channel(queue_capacity.max(1));
        let link = Self {
            address: address.into(),
            events_tx,
            outbound: Vec::new(),
            closed: false,
        };
        (link, events_rx)
    }

    /// Pushes a notification as if the peripheral had sent it.
    pub fn notify(&self, bytes: impl Into<Vec<u8>>) -> Result<(), LinkError> {
        self.push(LinkEvent::Notification(bytes.into()))
    }

    /// Simulates a peripheral-initiated disconnect.
    pub fn disconnect(&mut self) -> Result<(), LinkError> {
        self.push(LinkEvent::Disconnected)?;
        self.closed = true;
        Ok(())
    }

    /// Drains and returns all commands sent so far.
    pub fn take_outbound(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbound)
    }

    /// Sender half for feeding events from another task.
    pub fn event_sender(&self) -> mpsc::Sender<LinkEvent> {
        self.events_tx.clone()
    }

    fn push(&self, event: LinkEvent) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.events_tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => LinkError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => LinkError::Closed,
        })
    }
}

impl PeripheralLink for MockPeripheralLink {
    type Error = LinkError;

    fn address(&self) -> &str {
        &self.address
    }

    fn send_command(&mut self, command: &[u8]) -> Result<(), Self::Error> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.outbound.push(command.to_vec());
        Ok(())
    }
}

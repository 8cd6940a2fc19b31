use std::pin::Pin;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{NOTIFY_CHAR_UUID, SERVICE_UUID, WRITE_CHAR_UUID};
use crate::{LinkEvent, PeripheralLink};

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

#[derive(Debug, Clone)]
pub struct BtleplugLinkConfig {
    /// Device address to connect to; `None` picks the first device
    /// advertising the oximeter service.
    pub address: Option<String>,
    pub discovery_timeout: Duration,
    pub event_queue_capacity: usize,
    pub outbound_queue_capacity: usize,
}

impl Default for BtleplugLinkConfig {
    fn default() -> Self {
        Self {
            address: None,
            discovery_timeout: Duration::from_secs(10),
            event_queue_capacity: 256,
            outbound_queue_capacity: 16,
        }
    }
}

#[derive(Debug, Error)]
pub enum BtleplugLinkError {
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
    #[error("no bluetooth adapter available")]
    AdapterUnavailable,
    #[error("no matching device found within {0:?}")]
    DeviceNotFound(Duration),
    #[error("characteristic {0} not found")]
    CharacteristicMissing(Uuid),
    #[error("invalid protocol uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("link worker stopped")]
    WorkerFailed,
}

/// Connected and subscribed oximeter link backed by btleplug.
#[derive(Debug)]
pub struct BtleplugLink {
    address: String,
    outbound_tx: mpsc::Sender<Vec<u8>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl BtleplugLink {
    /// Discovers, connects and subscribes to the oximeter.
    ///
    /// Fails if no matching device shows up within the discovery timeout or
    /// if either protocol characteristic is missing. No retry is attempted.
    pub async fn connect(
        config: BtleplugLinkConfig,
    ) -> Result<(Self, mpsc::Receiver<LinkEvent>), BtleplugLinkError> {
        let service_uuid = Uuid::parse_str(SERVICE_UUID)?;
        let notify_uuid = Uuid::parse_str(NOTIFY_CHAR_UUID)?;
        let write_uuid = Uuid::parse_str(WRITE_CHAR_UUID)?;

        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BtleplugLinkError::AdapterUnavailable)?;

        if config.address.is_none() {
            warn!(
                "picking first device with matching service, consider passing a specific \
                 device address, especially if there could be multiple devices"
            );
        }

        let mut events = adapter.events().await?;
        adapter
            .start_scan(ScanFilter {
                services: vec![service_uuid],
            })
            .await?;
        let found = tokio::time::timeout(
            config.discovery_timeout,
            discover(&adapter, &mut events, config.address.as_deref(), service_uuid),
        )
        .await;
        let _ = adapter.stop_scan().await;
        let peripheral = match found {
            Ok(result) => result?,
            Err(_) => return Err(BtleplugLinkError::DeviceNotFound(config.discovery_timeout)),
        };

        let address = peripheral.address().to_string();
        info!(device = %address, "trying to connect");
        peripheral.connect().await?;
        peripheral.discover_services().await?;
        info!(device = %address, "device connected");

        let write_char = find_characteristic(&peripheral, write_uuid, CharPropFlags::empty())?;
        let notify_char = find_characteristic(&peripheral, notify_uuid, CharPropFlags::NOTIFY)?;
        peripheral.subscribe(&notify_char).await?;
        let notifications = peripheral.notifications().await?;

        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = tokio::spawn(run_worker(Worker {
            peripheral,
            write_char,
            notify_uuid,
            central_events: events,
            notifications,
            events_tx,
            outbound_rx,
            shutdown_rx,
        }));

        let link = Self {
            address,
            outbound_tx,
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        };
        Ok((link, events_rx))
    }

    /// Stops the worker and disconnects from the peripheral.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl PeripheralLink for BtleplugLink {
    type Error = BtleplugLinkError;

    fn address(&self) -> &str {
        &self.address
    }

    fn send_command(&mut self, command: &[u8]) -> Result<(), Self::Error> {
        self.outbound_tx
            .try_send(command.to_vec())
            .map_err(|_| BtleplugLinkError::WorkerFailed)
    }
}

impl Drop for BtleplugLink {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn discover(
    adapter: &Adapter,
    events: &mut CentralEvents,
    address: Option<&str>,
    service_uuid: Uuid,
) -> Result<Peripheral, BtleplugLinkError> {
    for peripheral in adapter.peripherals().await? {
        if matches_target(&peripheral, address, service_uuid).await? {
            return Ok(peripheral);
        }
    }
    while let Some(event) = events.next().await {
        let id = match event {
            CentralEvent::DeviceDiscovered(id) => id,
            CentralEvent::DeviceUpdated(id) => id,
            CentralEvent::ServicesAdvertisement { id, .. } => id,
            _ => continue,
        };
        let peripheral = adapter.peripheral(&id).await?;
        if matches_target(&peripheral, address, service_uuid).await? {
            return Ok(peripheral);
        }
    }
    Err(BtleplugLinkError::AdapterUnavailable)
}

async fn matches_target(
    peripheral: &Peripheral,
    address: Option<&str>,
    service_uuid: Uuid,
) -> Result<bool, BtleplugLinkError> {
    if let Some(address) = address {
        let by_addr = peripheral.address().to_string().eq_ignore_ascii_case(address);
        let by_id = peripheral.id().to_string().eq_ignore_ascii_case(address);
        return Ok(by_addr || by_id);
    }
    let advertised = peripheral
        .properties()
        .await?
        .map(|props| props.services.contains(&service_uuid))
        .unwrap_or(false);
    Ok(advertised)
}

fn find_characteristic(
    peripheral: &Peripheral,
    uuid: Uuid,
    required: CharPropFlags,
) -> Result<Characteristic, BtleplugLinkError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid && c.properties.contains(required))
        .ok_or(BtleplugLinkError::CharacteristicMissing(uuid))
}

struct Worker {
    peripheral: Peripheral,
    write_char: Characteristic,
    notify_uuid: Uuid,
    central_events: CentralEvents,
    notifications: Pin<Box<dyn Stream<Item = btleplug::api::ValueNotification> + Send>>,
    events_tx: mpsc::Sender<LinkEvent>,
    outbound_rx: mpsc::Receiver<Vec<u8>>,
    shutdown_rx: oneshot::Receiver<()>,
}

async fn run_worker(mut worker: Worker) {
    let peripheral_id = worker.peripheral.id();
    loop {
        tokio::select! {
            _ = &mut worker.shutdown_rx => {
                let _ = worker.peripheral.disconnect().await;
                break;
            }
            maybe_notification = worker.notifications.next() => {
                let Some(notification) = maybe_notification else {
                    let _ = worker.events_tx.send(LinkEvent::Disconnected).await;
                    break;
                };
                if notification.uuid != worker.notify_uuid {
                    continue;
                }
                if worker
                    .events_tx
                    .send(LinkEvent::Notification(notification.value))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Some(event) = worker.central_events.next() => {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == peripheral_id {
                        warn!(device = %worker.peripheral.address(), "device disconnected");
                        let _ = worker.events_tx.send(LinkEvent::Disconnected).await;
                        break;
                    }
                }
            }
            Some(command) = worker.outbound_rx.recv() => {
                debug!(command = ?command, "writing command");
                if let Err(err) = worker
                    .peripheral
                    .write(&worker.write_char, &command, WriteType::WithResponse)
                    .await
                {
                    warn!(%err, "command write failed");
                }
            }
        }
    }
}

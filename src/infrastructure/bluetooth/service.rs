//! Bluetooth Session Service
//!
//! Owns the transport and drives the connection lifecycle of the single
//! session a device runs:
//!
//! ```text
//! Idle -> Scanning -> Connecting -> Connected
//!            ^            |             |
//!            |   failure  |             | link lost
//!            +------------+        Disconnected
//!            ^                          |
//!            +--------------------------+
//! ```
//!
//! The game loop only sees a [`SessionHandle`]: reachability, the last
//! decoded remote coordinate, and a fire-and-forget local update.

use crate::domain::error::SyncError;
use crate::domain::models::{Axis, Coordinate, Role, SessionState};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::{
    BleConnection, ConnectionConfig, ConnectionResult, ResolvedChannel,
};
use crate::infrastructure::bluetooth::protocol::{encode_axis, encode_pair, service_spec};
use crate::infrastructure::bluetooth::remote::RemoteCoordinate;
use crate::infrastructure::bluetooth::scanner::{BleScanner, DiscoveryFilter, ScanMode};
use crate::infrastructure::bluetooth::transport::{LinkEvent, PeerDescriptor, Transport};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

struct Shared {
    state: AtomicU8,
    remote: Arc<RemoteCoordinate>,
    outbound: watch::Sender<Coordinate>,
}

/// What the game loop may ask of a session
pub trait PeerLink: Send {
    fn state(&self) -> SessionState;

    /// True only while connected
    fn is_reachable(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Last decoded peer position, origin until the first update arrives
    fn remote_coordinate(&self) -> Coordinate;

    /// Queue the local position for the peer. Ignored while unreachable.
    fn send_local_update(&self, coord: Coordinate);
}

/// The game loop's view of a running [`SessionService`]
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl PeerLink for SessionHandle {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    fn remote_coordinate(&self) -> Coordinate {
        self.shared.remote.get()
    }

    fn send_local_update(&self, coord: Coordinate) {
        if !self.is_reachable() {
            return;
        }
        self.shared.outbound.send_replace(coord);
    }
}

enum Wake {
    Link(Option<LinkEvent>),
    Outbound(bool),
}

/// Main session service coordinating scanning, connection, and sync
pub struct SessionService {
    transport: Arc<dyn Transport>,
    settings: Settings,
    shared: Arc<Shared>,
    scanner: BleScanner,
    connection: BleConnection,
    link_sender: mpsc::UnboundedSender<LinkEvent>,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
    outbound: watch::Receiver<Coordinate>,
    pending_peer: Option<PeerDescriptor>,
    inbound_peer: Option<u64>,
    link: Option<ConnectionResult>,
    last_sent: Option<Coordinate>,
}

impl SessionService {
    pub fn new(transport: Arc<dyn Transport>, settings: &Settings) -> (Self, SessionHandle) {
        let remote = Arc::new(RemoteCoordinate::default());
        let (outbound_tx, outbound_rx) = watch::channel(settings.start_position());
        let shared = Arc::new(Shared {
            state: AtomicU8::new(SessionState::Idle.as_u8()),
            remote: remote.clone(),
            outbound: outbound_tx,
        });
        let (link_sender, link_events) = mpsc::unbounded_channel();

        let service = Self {
            scanner: BleScanner::new(transport.clone()),
            connection: BleConnection::new(
                transport.clone(),
                ConnectionConfig::from_settings(settings),
                remote,
            ),
            transport,
            settings: settings.clone(),
            shared: shared.clone(),
            link_sender,
            link_events,
            outbound: outbound_rx,
            pending_peer: None,
            inbound_peer: None,
            link: None,
            last_sent: None,
        };
        (service, SessionHandle { shared })
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    fn set_state(&self, next: SessionState) {
        let previous =
            SessionState::from_u8(self.shared.state.swap(next.as_u8(), Ordering::AcqRel));
        if previous != next {
            info!("[{}] Session {} -> {}", self.settings.device_name(), previous, next);
        }
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.settings.retry_delay_ms)
    }

    /// Drive the session forever. Only returns when the radio is unusable.
    pub async fn run(mut self) -> Result<(), SyncError> {
        loop {
            if let Err(e) = self.step().await {
                error!("[{}] Session stopped: {}", self.settings.device_name(), e);
                return Err(e);
            }
        }
    }

    /// Perform the work of the current state. Errors are fatal.
    pub async fn step(&mut self) -> Result<(), SyncError> {
        match self.state() {
            SessionState::Idle => self.start().await,
            SessionState::Scanning => self.discover().await,
            SessionState::Connecting => self.establish().await,
            SessionState::Connected => self.pump().await,
            SessionState::Disconnected => {
                tokio::time::sleep(self.retry_delay()).await;
                self.restart_discovery().await
            }
        }
    }

    async fn start(&mut self) -> Result<(), SyncError> {
        self.transport.set_link_listener(self.link_sender.clone());
        self.restart_discovery().await
    }

    /// Forget stale link events, advertise again if publishing, and go back to Scanning
    async fn restart_discovery(&mut self) -> Result<(), SyncError> {
        while self.link_events.try_recv().is_ok() {}
        self.pending_peer = None;
        self.inbound_peer = None;

        if self.settings.role == Role::Publisher {
            let table = service_spec(&self.settings, self.settings.start_position());
            match self
                .transport
                .advertise(&self.settings.publisher_identity(), &table)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Advertising failed: {}", e),
            }
        }
        self.set_state(SessionState::Scanning);
        Ok(())
    }

    async fn discover(&mut self) -> Result<(), SyncError> {
        match self.settings.role {
            Role::Subscriber => {
                let filter = DiscoveryFilter::from_settings(&self.settings);
                match self
                    .scanner
                    .find(&filter, ScanMode::from_settings(&self.settings))
                    .await
                {
                    Ok(peer) => {
                        self.pending_peer = Some(peer);
                        self.set_state(SessionState::Connecting);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        debug!("Discovery ended without a match: {}", e);
                        tokio::time::sleep(self.retry_delay()).await;
                    }
                }
            }
            Role::Publisher => match self.link_events.recv().await {
                Some(LinkEvent::Connected { address }) => {
                    self.inbound_peer = Some(address);
                    self.set_state(SessionState::Connecting);
                }
                Some(LinkEvent::Disconnected { .. }) => {}
                None => {
                    return Err(SyncError::TransportUnavailable(
                        "link events closed".to_string(),
                    ))
                }
            },
        }
        Ok(())
    }

    async fn establish(&mut self) -> Result<(), SyncError> {
        let attempt = match (self.pending_peer.take(), self.inbound_peer.take()) {
            (Some(peer), _) => self.connection.connect(&peer).await,
            (None, Some(address)) => self.connection.bind_local(address).await,
            (None, None) => return self.restart_discovery().await,
        };

        match attempt {
            Ok(link) => {
                self.link = Some(link);
                self.last_sent = None;
                self.set_state(SessionState::Connected);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                tokio::time::sleep(self.retry_delay()).await;
                self.restart_discovery().await
            }
        }
    }

    /// Connected: forward local updates until the link goes away
    async fn pump(&mut self) -> Result<(), SyncError> {
        let wake = tokio::select! {
            event = self.link_events.recv() => Wake::Link(event),
            changed = self.outbound.changed() => Wake::Outbound(changed.is_ok()),
        };

        match wake {
            Wake::Link(Some(LinkEvent::Disconnected { address })) => {
                warn!("Link to {:#X} lost", address);
                self.on_link_lost().await;
            }
            Wake::Link(_) => {}
            Wake::Outbound(true) => {
                let coord = *self.outbound.borrow_and_update();
                match self.write_local(coord).await {
                    Ok(()) => {}
                    Err(e @ (SyncError::LinkLost | SyncError::NotConnected)) => {
                        warn!("Write failed: {}", e);
                        self.on_link_lost().await;
                    }
                    Err(e) => warn!("Write failed: {}", e),
                }
            }
            Wake::Outbound(false) => {}
        }
        Ok(())
    }

    async fn on_link_lost(&mut self) {
        self.link = None;
        self.last_sent = None;
        self.transport.disconnect().await;
        self.set_state(SessionState::Disconnected);
    }

    /// Write whichever axes changed since the last write on this link
    async fn write_local(&mut self, coord: Coordinate) -> Result<(), SyncError> {
        let link = self.link.ok_or(SyncError::NotConnected)?;
        let last = self.last_sent;

        match link.outbound {
            ResolvedChannel::Combined(info) => {
                if last != Some(coord) {
                    self.transport
                        .write_attribute(info.handle, &encode_pair(coord))
                        .await?;
                }
            }
            ResolvedChannel::Split { x, y } => {
                for (axis, info) in [(Axis::X, x), (Axis::Y, y)] {
                    let value = coord.axis(axis);
                    if last.map(|l| l.axis(axis)) != Some(value) {
                        self.transport
                            .write_attribute(info.handle, &encode_axis(value))
                            .await?;
                    }
                }
            }
        }

        self.last_sent = Some(coord);
        Ok(())
    }
}

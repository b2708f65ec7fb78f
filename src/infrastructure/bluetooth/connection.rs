//! BLE Connection Module
//!
//! Brings a fresh link up to the point where coordinates can flow: service
//! check, attribute resolution, inbound subscriptions and the optional
//! initial read.

use crate::domain::error::SyncError;
use crate::domain::models::{Axis, Role};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::protocol::{Channel, CoordinateChannels};
use crate::infrastructure::bluetooth::remote::RemoteCoordinate;
use crate::infrastructure::bluetooth::transport::{
    AttributeInfo, NotifyCallback, PeerDescriptor, Transport,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub role: Role,
    /// Service UUID to look for
    pub service_uuid: String,
    pub channels: CoordinateChannels,
    /// Seed the remote coordinate from the peer's current values after subscribing
    pub seed_from_initial_read: bool,
}

impl ConnectionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            role: settings.role,
            service_uuid: settings.service_uuid.clone(),
            channels: CoordinateChannels::for_role(settings, settings.role),
            seed_from_initial_read: settings.seed_from_initial_read,
        }
    }
}

/// One direction of traffic resolved to attribute handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedChannel {
    Combined(AttributeInfo),
    Split { x: AttributeInfo, y: AttributeInfo },
}

impl ResolvedChannel {
    fn attributes(&self) -> Vec<(Option<Axis>, AttributeInfo)> {
        match *self {
            Self::Combined(info) => vec![(None, info)],
            Self::Split { x, y } => vec![(Some(Axis::X), x), (Some(Axis::Y), y)],
        }
    }
}

/// Result of a successful connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionResult {
    pub peer_address: u64,
    pub inbound: ResolvedChannel,
    pub outbound: ResolvedChannel,
}

/// BLE Connection handler
pub struct BleConnection {
    transport: Arc<dyn Transport>,
    config: ConnectionConfig,
    remote: Arc<RemoteCoordinate>,
}

impl BleConnection {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ConnectionConfig,
        remote: Arc<RemoteCoordinate>,
    ) -> Self {
        Self {
            transport,
            config,
            remote,
        }
    }

    /// Subscriber side: open a link to `peer` and attach to its service.
    ///
    /// Any failure after the link is up tears it down before returning.
    pub async fn connect(&self, peer: &PeerDescriptor) -> Result<ConnectionResult, SyncError> {
        info!("Connecting to '{}' at {:#X}", peer.name, peer.address);
        self.transport.connect(peer).await?;
        self.attach_or_teardown(peer.address).await
    }

    /// Publisher side: a peer linked to us, attach to the table we host.
    pub async fn bind_local(&self, peer_address: u64) -> Result<ConnectionResult, SyncError> {
        info!("Peer {:#X} connected", peer_address);
        self.attach_or_teardown(peer_address).await
    }

    async fn attach_or_teardown(&self, peer_address: u64) -> Result<ConnectionResult, SyncError> {
        match self.attach(peer_address).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Attaching to {:#X} failed: {}", peer_address, e);
                self.transport.disconnect().await;
                Err(e)
            }
        }
    }

    async fn attach(&self, peer_address: u64) -> Result<ConnectionResult, SyncError> {
        if !self.transport.has_service(&self.config.service_uuid).await? {
            return Err(SyncError::ServiceNotFound(self.config.service_uuid.clone()));
        }
        debug!(
            "Found coordinate service {}, resolving {:?}",
            self.config.service_uuid,
            self.config.channels.required_uuids()
        );

        let inbound = self.resolve(&self.config.channels.inbound).await?;
        let outbound = self.resolve(&self.config.channels.outbound).await?;

        self.subscribe(&inbound).await?;
        if self.config.role == Role::Subscriber && self.config.seed_from_initial_read {
            self.seed(&inbound).await;
        }

        info!("Coordinate link to {:#X} ready", peer_address);
        Ok(ConnectionResult {
            peer_address,
            inbound,
            outbound,
        })
    }

    async fn resolve(&self, channel: &Channel) -> Result<ResolvedChannel, SyncError> {
        Ok(match channel {
            Channel::Combined(uuid) => ResolvedChannel::Combined(self.find(uuid).await?),
            Channel::Split { x, y } => ResolvedChannel::Split {
                x: self.find(x).await?,
                y: self.find(y).await?,
            },
        })
    }

    async fn find(&self, uuid: &str) -> Result<AttributeInfo, SyncError> {
        self.transport
            .find_attribute(&self.config.service_uuid, uuid)
            .await?
            .ok_or_else(|| SyncError::AttributeNotFound(uuid.to_string()))
    }

    /// Register one callback per inbound attribute
    async fn subscribe(&self, inbound: &ResolvedChannel) -> Result<(), SyncError> {
        for (axis, info) in inbound.attributes() {
            if self.config.role == Role::Subscriber && !info.properties.notify {
                warn!("Attribute {:?} cannot notify, relying on reads", info.handle);
                continue;
            }
            let remote = self.remote.clone();
            let callback: NotifyCallback = match axis {
                Some(axis) => Arc::new(move |payload: &[u8]| {
                    remote.apply_axis(axis, payload);
                }),
                None => Arc::new(move |payload: &[u8]| {
                    remote.apply_pair(payload);
                }),
            };
            self.transport.subscribe(info.handle, callback).await?;
        }
        Ok(())
    }

    /// Initial read of the peer's position. Failures leave the remote as it was.
    async fn seed(&self, inbound: &ResolvedChannel) {
        for (axis, info) in inbound.attributes() {
            if !info.properties.read {
                continue;
            }
            match self.transport.read_attribute(info.handle).await {
                Ok(payload) => {
                    match axis {
                        Some(axis) => self.remote.apply_axis(axis, &payload),
                        None => self.remote.apply_pair(&payload),
                    };
                }
                Err(e) => warn!("Initial read of {:?} failed: {}", info.handle, e),
            }
        }
        debug!("Seeded remote coordinate at {}", self.remote.get());
    }
}

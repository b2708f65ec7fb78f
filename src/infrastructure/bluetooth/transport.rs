//! Radio Transport Capability
//!
//! The session consumes the radio through this trait. The same capability set
//! serves both roles: a publisher operates on the attributes it hosts, a
//! subscriber on the attributes of the peer it is linked to.

use crate::domain::error::SyncError;
use crate::domain::models::PeerIdentity;
use crate::infrastructure::bluetooth::protocol::{AttributeProperties, ServiceSpec};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Invoked with the raw payload whenever the other side updates an attribute.
/// Runs on the transport's delivery context, never on the game loop.
pub type NotifyCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeHandle(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    pub handle: AttributeHandle,
    pub properties: AttributeProperties,
}

/// One advertisement seen while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    pub address: u64,
    pub name: String,
    pub service_uuids: Vec<String>,
    pub signal_strength: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected { address: u64 },
    Disconnected { address: u64 },
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Host `service` and start broadcasting `identity`. Idempotent.
    async fn advertise(
        &self,
        identity: &PeerIdentity,
        service: &ServiceSpec,
    ) -> Result<(), SyncError>;

    /// Register the channel that receives link up/down events.
    fn set_link_listener(&self, listener: mpsc::UnboundedSender<LinkEvent>);

    /// Start delivering advertisements to `sink` until [`Transport::stop_scan`].
    async fn start_scan(
        &self,
        sink: mpsc::UnboundedSender<PeerDescriptor>,
    ) -> Result<(), SyncError>;

    async fn stop_scan(&self);

    async fn connect(&self, peer: &PeerDescriptor) -> Result<(), SyncError>;

    async fn has_service(&self, service_uuid: &str) -> Result<bool, SyncError>;

    async fn find_attribute(
        &self,
        service_uuid: &str,
        attribute_uuid: &str,
    ) -> Result<Option<AttributeInfo>, SyncError>;

    async fn read_attribute(&self, handle: AttributeHandle) -> Result<Vec<u8>, SyncError>;

    /// Subscriber: write to the peer. Publisher: set the hosted value and notify.
    async fn write_attribute(
        &self,
        handle: AttributeHandle,
        payload: &[u8],
    ) -> Result<(), SyncError>;

    /// Subscriber: change notifications. Publisher: writes from the peer.
    async fn subscribe(
        &self,
        handle: AttributeHandle,
        on_change: NotifyCallback,
    ) -> Result<(), SyncError>;

    /// Tear down the link. Safe to call when nothing is connected.
    async fn disconnect(&self);
}

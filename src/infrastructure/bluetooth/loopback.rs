//! Loopback Radio
//!
//! In-memory radio implementing [`Transport`]. Every endpoint created from one
//! [`LoopbackRadio`] shares the same "air": advertisements reach active
//! scanners, links join two endpoints, and attribute callbacks are delivered
//! on a per-endpoint delivery thread so they preempt the caller the way radio
//! stack callbacks do.
//!
//! Endpoints also expose fault controls (power, refused connections, missing
//! attributes, link drops) for exercising the session's recovery paths.

use crate::domain::error::SyncError;
use crate::domain::models::PeerIdentity;
use crate::infrastructure::bluetooth::protocol::{AttributeProperties, ServiceSpec};
use crate::infrastructure::bluetooth::transport::{
    AttributeHandle, AttributeInfo, LinkEvent, NotifyCallback, PeerDescriptor, Transport,
};
use std::collections::HashMap;
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

const BASE_ADDRESS: u64 = 0x24_0A_C4_00_00_00;

struct Delivery {
    callback: NotifyCallback,
    payload: Vec<u8>,
}

struct HostedAttribute {
    uuid: String,
    properties: AttributeProperties,
    value: Vec<u8>,
    /// Publisher-side slot, fired when the peer writes
    on_write: Option<NotifyCallback>,
    /// Subscriber-side slot, fired when the host updates the value
    subscriber: Option<NotifyCallback>,
}

struct GattTable {
    service_uuid: String,
    attributes: Vec<HostedAttribute>,
}

impl GattTable {
    fn from_spec(spec: &ServiceSpec) -> Self {
        Self {
            service_uuid: spec.uuid.clone(),
            attributes: spec
                .attributes
                .iter()
                .map(|a| HostedAttribute {
                    uuid: a.uuid.clone(),
                    properties: a.properties,
                    value: a.initial_value.clone(),
                    on_write: None,
                    subscriber: None,
                })
                .collect(),
        }
    }

    fn attribute_mut(
        &mut self,
        handle: AttributeHandle,
    ) -> Result<&mut HostedAttribute, SyncError> {
        (handle.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.attributes.get_mut(index))
            .ok_or_else(|| SyncError::AttributeNotFound(format!("handle {}", handle.0)))
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    peer: u64,
    /// True on the side that hosts the attribute table
    hosting: bool,
}

struct Endpoint {
    identity: Option<PeerIdentity>,
    advertising: bool,
    table: Option<GattTable>,
    link: Option<Link>,
    /// Last link ended without a local disconnect request
    severed: bool,
    link_listener: Option<mpsc::UnboundedSender<LinkEvent>>,
    scan_sink: Option<mpsc::UnboundedSender<PeerDescriptor>>,
    delivery: std_mpsc::Sender<Delivery>,
    powered: bool,
    refuse_connections: u32,
}

impl Endpoint {
    fn new(delivery: std_mpsc::Sender<Delivery>) -> Self {
        Self {
            identity: None,
            advertising: false,
            table: None,
            link: None,
            severed: false,
            link_listener: None,
            scan_sink: None,
            delivery,
            powered: true,
            refuse_connections: 0,
        }
    }

    fn notify_link(&self, event: LinkEvent) {
        if let Some(listener) = &self.link_listener {
            let _ = listener.send(event);
        }
    }

    fn deliver(&self, callback: NotifyCallback, payload: &[u8]) {
        let _ = self.delivery.send(Delivery {
            callback,
            payload: payload.to_vec(),
        });
    }
}

#[derive(Default)]
struct Air {
    next_address: u64,
    endpoints: HashMap<u64, Endpoint>,
}

impl Air {
    fn endpoint(&self, address: u64) -> Result<&Endpoint, SyncError> {
        self.endpoints
            .get(&address)
            .ok_or_else(|| {
                SyncError::TransportUnavailable(format!("endpoint {:#X} is gone", address))
            })
    }

    fn endpoint_mut(&mut self, address: u64) -> Result<&mut Endpoint, SyncError> {
        self.endpoints
            .get_mut(&address)
            .ok_or_else(|| {
                SyncError::TransportUnavailable(format!("endpoint {:#X} is gone", address))
            })
    }

    fn descriptor(&self, address: u64) -> Option<PeerDescriptor> {
        let endpoint = self.endpoints.get(&address)?;
        let identity = endpoint.identity.as_ref()?;
        if !endpoint.advertising {
            return None;
        }
        Some(PeerDescriptor {
            address,
            name: identity.name.clone(),
            service_uuids: vec![identity.service_uuid.clone()],
            signal_strength: -42,
        })
    }

    /// Push `address`'s advertisement to every active scanner
    fn announce(&self, address: u64) {
        let Some(descriptor) = self.descriptor(address) else {
            return;
        };
        for (other, endpoint) in &self.endpoints {
            if *other == address {
                continue;
            }
            if let Some(sink) = &endpoint.scan_sink {
                let _ = sink.send(descriptor.clone());
            }
        }
    }

    /// Which table an endpoint's attribute operations act on, and whether it hosts it
    fn target_table(&self, address: u64) -> Result<(u64, bool), SyncError> {
        let endpoint = self.endpoint(address)?;
        match endpoint.link {
            Some(Link {
                peer,
                hosting: false,
            }) => Ok((peer, false)),
            _ if endpoint.table.is_some() => Ok((address, true)),
            _ if endpoint.severed => Err(SyncError::LinkLost),
            _ => Err(SyncError::NotConnected),
        }
    }

    fn table_mut(&mut self, owner: u64) -> Result<&mut GattTable, SyncError> {
        self.endpoint_mut(owner)?
            .table
            .as_mut()
            .ok_or(SyncError::NotConnected)
    }

    /// Drop `address`'s link. `local` marks a disconnect the endpoint asked for.
    fn sever(&mut self, address: u64, local: bool) {
        let Some(endpoint) = self.endpoints.get_mut(&address) else {
            return;
        };
        let Some(link) = endpoint.link.take() else {
            return;
        };
        endpoint.severed = !local;

        let host = if link.hosting { address } else { link.peer };
        if let Some(peer) = self.endpoints.get_mut(&link.peer) {
            peer.link = None;
            peer.severed = true;
        }
        if let Some(table) = self
            .endpoints
            .get_mut(&host)
            .and_then(|endpoint| endpoint.table.as_mut())
        {
            for attribute in &mut table.attributes {
                attribute.subscriber = None;
            }
        }

        if let Some(endpoint) = self.endpoints.get(&address) {
            endpoint.notify_link(LinkEvent::Disconnected { address: link.peer });
        }
        if let Some(peer) = self.endpoints.get(&link.peer) {
            peer.notify_link(LinkEvent::Disconnected { address });
        }
        info!("Loopback link {:#X} <-> {:#X} closed", address, link.peer);
    }
}

fn lock(air: &Mutex<Air>) -> Result<MutexGuard<'_, Air>, SyncError> {
    air.lock()
        .map_err(|_| SyncError::TransportUnavailable("radio state poisoned".to_string()))
}

/// Shared medium that loopback endpoints talk over
#[derive(Clone, Default)]
pub struct LoopbackRadio {
    air: Arc<Mutex<Air>>,
}

impl LoopbackRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Power up a new device on this radio
    pub fn endpoint(&self) -> Result<LoopbackTransport, SyncError> {
        let mut air = lock(&self.air)?;
        air.next_address += 1;
        let address = BASE_ADDRESS + air.next_address;

        let (delivery_tx, delivery_rx) = std_mpsc::channel::<Delivery>();
        std::thread::Builder::new()
            .name(format!("radio-{:X}", address))
            .spawn(move || {
                for delivery in delivery_rx {
                    (delivery.callback)(&delivery.payload);
                }
            })
            .map_err(|e| SyncError::TransportUnavailable(e.to_string()))?;

        air.endpoints.insert(address, Endpoint::new(delivery_tx));
        debug!("Loopback endpoint {:#X} powered up", address);

        Ok(LoopbackTransport {
            air: self.air.clone(),
            address,
        })
    }
}

/// Handles are 1-based table positions and must fit the 16-bit handle space
fn handle_at(index: usize, uuid: &str) -> Result<AttributeHandle, SyncError> {
    index
        .checked_add(1)
        .and_then(|handle| u16::try_from(handle).ok())
        .map(AttributeHandle)
        .ok_or_else(|| SyncError::AttributeNotFound(uuid.to_string()))
}

/// One device's view of the loopback radio
pub struct LoopbackTransport {
    air: Arc<Mutex<Air>>,
    address: u64,
}

#[cfg(test)]
impl LoopbackTransport {
    pub fn address(&self) -> u64 {
        self.address
    }

    /// A powered-off radio fails to advertise or scan
    pub fn set_powered(&self, powered: bool) {
        if let Ok(mut air) = lock(&self.air) {
            if let Ok(endpoint) = air.endpoint_mut(self.address) {
                endpoint.powered = powered;
            }
        }
    }

    /// Refuse the next `count` inbound connection attempts
    pub fn refuse_next_connections(&self, count: u32) {
        if let Ok(mut air) = lock(&self.air) {
            if let Ok(endpoint) = air.endpoint_mut(self.address) {
                endpoint.refuse_connections = count;
            }
        }
    }

    /// Drop an attribute from the hosted table, as a peer with the wrong firmware would
    pub fn remove_attribute(&self, uuid: &str) {
        if let Ok(mut air) = lock(&self.air) {
            if let Ok(table) = air.table_mut(self.address) {
                table.attributes.retain(|a| a.uuid != uuid);
            }
        }
    }

    /// Simulate the peer walking out of range
    pub fn drop_link(&self) {
        if let Ok(mut air) = lock(&self.air) {
            air.sever(self.address, false);
        }
    }

    pub fn is_linked(&self) -> bool {
        lock(&self.air)
            .ok()
            .and_then(|air| air.endpoint(self.address).ok().map(|e| e.link.is_some()))
            .unwrap_or(false)
    }

    pub fn is_advertising(&self) -> bool {
        lock(&self.air)
            .ok()
            .and_then(|air| air.endpoint(self.address).ok().map(|e| e.advertising))
            .unwrap_or(false)
    }

    /// Current value of a hosted attribute
    pub fn hosted_value(&self, uuid: &str) -> Option<Vec<u8>> {
        let mut air = lock(&self.air).ok()?;
        let table = air.table_mut(self.address).ok()?;
        table
            .attributes
            .iter()
            .find(|a| a.uuid == uuid)
            .map(|a| a.value.clone())
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        if let Ok(mut air) = self.air.lock() {
            air.sever(self.address, true);
            air.endpoints.remove(&self.address);
        }
    }
}

#[async_trait::async_trait]
impl Transport for LoopbackTransport {
    async fn advertise(
        &self,
        identity: &PeerIdentity,
        service: &ServiceSpec,
    ) -> Result<(), SyncError> {
        let mut air = lock(&self.air)?;
        let endpoint = air.endpoint_mut(self.address)?;
        if !endpoint.powered {
            return Err(SyncError::TransportUnavailable(
                "radio is powered off".to_string(),
            ));
        }

        let keep_table = endpoint
            .table
            .as_ref()
            .is_some_and(|t| t.service_uuid == service.uuid);
        if !keep_table {
            endpoint.table = Some(GattTable::from_spec(service));
        }
        endpoint.identity = Some(identity.clone());

        if endpoint.advertising || endpoint.link.is_some() {
            return Ok(());
        }
        endpoint.advertising = true;
        info!(
            "Advertising '{}' with service {}",
            identity.name, identity.service_uuid
        );
        air.announce(self.address);
        Ok(())
    }

    fn set_link_listener(&self, listener: mpsc::UnboundedSender<LinkEvent>) {
        if let Ok(mut air) = lock(&self.air) {
            if let Ok(endpoint) = air.endpoint_mut(self.address) {
                endpoint.link_listener = Some(listener);
            }
        }
    }

    async fn start_scan(
        &self,
        sink: mpsc::UnboundedSender<PeerDescriptor>,
    ) -> Result<(), SyncError> {
        let mut air = lock(&self.air)?;
        let endpoint = air.endpoint_mut(self.address)?;
        if !endpoint.powered {
            return Err(SyncError::TransportUnavailable(
                "radio is powered off".to_string(),
            ));
        }
        endpoint.scan_sink = Some(sink.clone());

        let visible: Vec<PeerDescriptor> = air
            .endpoints
            .keys()
            .filter(|&&address| address != self.address)
            .filter_map(|&address| air.descriptor(address))
            .collect();
        for descriptor in visible {
            let _ = sink.send(descriptor);
        }
        Ok(())
    }

    async fn stop_scan(&self) {
        if let Ok(mut air) = lock(&self.air) {
            if let Ok(endpoint) = air.endpoint_mut(self.address) {
                endpoint.scan_sink = None;
            }
        }
    }

    async fn connect(&self, peer: &PeerDescriptor) -> Result<(), SyncError> {
        let mut air = lock(&self.air)?;
        let refused = || SyncError::ConnectFailed(peer.name.clone());

        if air.endpoint(self.address)?.link.is_some() {
            return Err(refused());
        }
        let target = air.endpoints.get_mut(&peer.address).ok_or_else(refused)?;
        if target.refuse_connections > 0 {
            target.refuse_connections -= 1;
            return Err(refused());
        }
        if !target.advertising || target.link.is_some() {
            return Err(refused());
        }

        target.advertising = false;
        target.severed = false;
        target.link = Some(Link {
            peer: self.address,
            hosting: true,
        });
        target.notify_link(LinkEvent::Connected {
            address: self.address,
        });

        let endpoint = air.endpoint_mut(self.address)?;
        endpoint.severed = false;
        endpoint.link = Some(Link {
            peer: peer.address,
            hosting: false,
        });
        endpoint.notify_link(LinkEvent::Connected {
            address: peer.address,
        });

        info!("Loopback link {:#X} -> {:#X} established", self.address, peer.address);
        Ok(())
    }

    async fn has_service(&self, service_uuid: &str) -> Result<bool, SyncError> {
        let mut air = lock(&self.air)?;
        let (owner, _) = air.target_table(self.address)?;
        Ok(air.table_mut(owner)?.service_uuid == service_uuid)
    }

    async fn find_attribute(
        &self,
        service_uuid: &str,
        attribute_uuid: &str,
    ) -> Result<Option<AttributeInfo>, SyncError> {
        let mut air = lock(&self.air)?;
        let (owner, _) = air.target_table(self.address)?;
        let table = air.table_mut(owner)?;
        if table.service_uuid != service_uuid {
            return Ok(None);
        }

        let Some(index) = table.attributes.iter().position(|a| a.uuid == attribute_uuid) else {
            return Ok(None);
        };
        Ok(Some(AttributeInfo {
            handle: handle_at(index, attribute_uuid)?,
            properties: table.attributes[index].properties,
        }))
    }

    async fn read_attribute(&self, handle: AttributeHandle) -> Result<Vec<u8>, SyncError> {
        let mut air = lock(&self.air)?;
        let (owner, hosting) = air.target_table(self.address)?;
        let attribute = air.table_mut(owner)?.attribute_mut(handle)?;
        if !hosting && !attribute.properties.read {
            return Err(SyncError::NotPermitted(attribute.uuid.clone()));
        }
        Ok(attribute.value.clone())
    }

    async fn write_attribute(
        &self,
        handle: AttributeHandle,
        payload: &[u8],
    ) -> Result<(), SyncError> {
        let mut air = lock(&self.air)?;
        let (owner, hosting) = air.target_table(self.address)?;
        let attribute = air.table_mut(owner)?.attribute_mut(handle)?;

        if !hosting && !attribute.properties.write {
            return Err(SyncError::NotPermitted(attribute.uuid.clone()));
        }
        attribute.value = payload.to_vec();
        trace!("{} <- {:?}", attribute.uuid, String::from_utf8_lossy(payload));
        let subscriber = attribute.subscriber.clone();
        let on_write = attribute.on_write.clone();

        let (callback, recipient) = if hosting {
            let peer = air.endpoint(self.address)?.link.map(|link| link.peer);
            (subscriber, peer)
        } else {
            (on_write, Some(owner))
        };

        if let (Some(callback), Some(recipient)) = (callback, recipient) {
            if let Ok(endpoint) = air.endpoint(recipient) {
                endpoint.deliver(callback, payload);
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        handle: AttributeHandle,
        on_change: NotifyCallback,
    ) -> Result<(), SyncError> {
        let mut air = lock(&self.air)?;
        let (owner, hosting) = air.target_table(self.address)?;
        let attribute = air.table_mut(owner)?.attribute_mut(handle)?;

        if hosting {
            attribute.on_write = Some(on_change);
        } else if attribute.properties.notify {
            attribute.subscriber = Some(on_change);
        } else {
            return Err(SyncError::NotPermitted(attribute.uuid.clone()));
        }
        Ok(())
    }

    async fn disconnect(&self) {
        if let Ok(mut air) = lock(&self.air) {
            air.sever(self.address, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Coordinate;
    use crate::domain::settings::Settings;
    use crate::infrastructure::bluetooth::protocol::service_spec;
    use std::time::Duration;

    async fn linked_pair(
        radio: &LoopbackRadio,
    ) -> (LoopbackTransport, LoopbackTransport, Settings) {
        let settings = Settings::default();
        let host = radio.endpoint().unwrap();
        let client = radio.endpoint().unwrap();
        host.advertise(
            &settings.publisher_identity(),
            &service_spec(&settings, Coordinate::new(10, 120)),
        )
        .await
        .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.start_scan(tx).await.unwrap();
        let peer = rx.recv().await.unwrap();
        client.stop_scan().await;
        client.connect(&peer).await.unwrap();
        (host, client, settings)
    }

    fn capture() -> (NotifyCallback, std_mpsc::Receiver<(Vec<u8>, Option<String>)>) {
        let (tx, rx) = std_mpsc::channel();
        let tx = Mutex::new(tx);
        let callback: NotifyCallback = Arc::new(move |payload: &[u8]| {
            let thread = std::thread::current().name().map(str::to_string);
            if let Ok(tx) = tx.lock() {
                let _ = tx.send((payload.to_vec(), thread));
            }
        });
        (callback, rx)
    }

    #[tokio::test]
    async fn test_scan_sees_advertiser() {
        let radio = LoopbackRadio::new();
        let (host, client, settings) = linked_pair(&radio).await;

        assert!(host.is_linked());
        assert!(client.is_linked());
        assert!(!host.is_advertising());
        assert!(client.has_service(&settings.service_uuid).await.unwrap());
        assert!(!client.has_service("not-our-service").await.unwrap());
    }

    #[tokio::test]
    async fn test_host_write_notifies_subscriber_on_delivery_thread() {
        let radio = LoopbackRadio::new();
        let (host, client, settings) = linked_pair(&radio).await;

        let info = client
            .find_attribute(&settings.service_uuid, &settings.read_x_char_uuid)
            .await
            .unwrap()
            .unwrap();
        assert!(info.properties.notify);
        assert_eq!(client.read_attribute(info.handle).await.unwrap(), b"10".to_vec());

        let (callback, rx) = capture();
        client.subscribe(info.handle, callback).await.unwrap();

        let hosted = host
            .find_attribute(&settings.service_uuid, &settings.read_x_char_uuid)
            .await
            .unwrap()
            .unwrap();
        host.write_attribute(hosted.handle, b"87").await.unwrap();

        let (payload, thread) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(payload, b"87".to_vec());
        let expected = format!("radio-{:X}", client.address());
        assert_eq!(thread.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_client_write_reaches_host_callback() {
        let radio = LoopbackRadio::new();
        let (host, client, settings) = linked_pair(&radio).await;

        let hosted = host
            .find_attribute(&settings.service_uuid, &settings.write_y_char_uuid)
            .await
            .unwrap()
            .unwrap();
        let (callback, rx) = capture();
        host.subscribe(hosted.handle, callback).await.unwrap();

        let remote = client
            .find_attribute(&settings.service_uuid, &settings.write_y_char_uuid)
            .await
            .unwrap()
            .unwrap();
        client.write_attribute(remote.handle, b"33").await.unwrap();

        let (payload, _) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(payload, b"33".to_vec());
        assert_eq!(host.hosted_value(&settings.write_y_char_uuid), Some(b"33".to_vec()));

        // readable-only attributes reject client writes
        let read_only = client
            .find_attribute(&settings.service_uuid, &settings.read_x_char_uuid)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            client.write_attribute(read_only.handle, b"1").await,
            Err(SyncError::NotPermitted(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_reported_to_both_sides() {
        let radio = LoopbackRadio::new();
        let host = radio.endpoint().unwrap();
        let client = radio.endpoint().unwrap();
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let (client_tx, mut client_rx) = mpsc::unbounded_channel();
        host.set_link_listener(host_tx);
        client.set_link_listener(client_tx);

        let settings = Settings::default();
        host.advertise(
            &settings.publisher_identity(),
            &service_spec(&settings, Coordinate::ORIGIN),
        )
        .await
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.start_scan(tx).await.unwrap();
        let peer = rx.recv().await.unwrap();
        client.connect(&peer).await.unwrap();

        assert_eq!(
            host_rx.recv().await,
            Some(LinkEvent::Connected { address: client.address() })
        );
        assert_eq!(
            client_rx.recv().await,
            Some(LinkEvent::Connected { address: host.address() })
        );

        client.disconnect().await;
        client.disconnect().await;
        host.disconnect().await;

        assert_eq!(
            host_rx.recv().await,
            Some(LinkEvent::Disconnected { address: client.address() })
        );
        assert_eq!(
            client_rx.recv().await,
            Some(LinkEvent::Disconnected { address: host.address() })
        );
        assert!(host_rx.try_recv().is_err());
        assert!(client_rx.try_recv().is_err());
        assert!(!host.is_advertising());
    }

    #[tokio::test]
    async fn test_operations_after_link_drop() {
        let radio = LoopbackRadio::new();
        let (host, client, settings) = linked_pair(&radio).await;
        let info = client
            .find_attribute(&settings.service_uuid, &settings.read_x_char_uuid)
            .await
            .unwrap()
            .unwrap();

        host.drop_link();
        assert_eq!(client.read_attribute(info.handle).await, Err(SyncError::LinkLost));

        let idle = radio.endpoint().unwrap();
        assert_eq!(idle.read_attribute(info.handle).await, Err(SyncError::NotConnected));
    }

    #[tokio::test]
    async fn test_powered_off_radio_is_unavailable() {
        let radio = LoopbackRadio::new();
        let endpoint = radio.endpoint().unwrap();
        endpoint.set_powered(false);
        let settings = Settings::default();

        let result = endpoint
            .advertise(
                &settings.publisher_identity(),
                &service_spec(&settings, Coordinate::ORIGIN),
            )
            .await;
        assert!(matches!(result, Err(SyncError::TransportUnavailable(_))));

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(endpoint.start_scan(tx).await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let radio = LoopbackRadio::new();
        let settings = Settings::default();
        let host = radio.endpoint().unwrap();
        let client = radio.endpoint().unwrap();
        host.advertise(
            &settings.publisher_identity(),
            &service_spec(&settings, Coordinate::ORIGIN),
        )
        .await
        .unwrap();
        host.refuse_next_connections(1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.start_scan(tx).await.unwrap();
        let peer = rx.recv().await.unwrap();

        assert!(matches!(
            client.connect(&peer).await,
            Err(SyncError::ConnectFailed(_))
        ));
        assert!(!client.is_linked());
        client.connect(&peer).await.unwrap();
        assert!(client.is_linked());
    }

    #[test]
    fn test_handles_stay_within_16_bits() {
        assert_eq!(handle_at(0, "x").unwrap(), AttributeHandle(1));
        assert_eq!(handle_at(65_534, "x").unwrap(), AttributeHandle(u16::MAX));
        assert_eq!(
            handle_at(65_535, "late"),
            Err(SyncError::AttributeNotFound("late".to_string()))
        );
        assert!(handle_at(usize::MAX, "x").is_err());
    }
}

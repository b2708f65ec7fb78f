//! BLE Scanner Module
//!
//! Finds the publisher among incoming advertisements.

use crate::domain::error::SyncError;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::transport::{PeerDescriptor, Transport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, trace};

/// Which advertisements count as our peer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryFilter {
    /// Exact advertised name, or any name when `None`
    pub name: Option<String>,
    pub service_uuid: Option<String>,
}

impl DiscoveryFilter {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            name: settings
                .match_peer_name
                .then(|| settings.publisher_name.clone()),
            service_uuid: Some(settings.service_uuid.clone()),
        }
    }

    pub fn matches(&self, peer: &PeerDescriptor) -> bool {
        if let Some(name) = &self.name {
            if peer.name != *name {
                return false;
            }
        }
        match &self.service_uuid {
            Some(uuid) => peer.service_uuids.iter().any(|s| s.eq_ignore_ascii_case(uuid)),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Keep scanning until a match shows up
    Continuous,
    /// Give up after the window
    Timeout(Duration),
}

impl ScanMode {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.scan_timeout_ms {
            Some(ms) => Self::Timeout(Duration::from_millis(ms)),
            None => Self::Continuous,
        }
    }
}

/// BLE Scanner for discovering the publisher
pub struct BleScanner {
    transport: Arc<dyn Transport>,
}

impl BleScanner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Scan until the first advertisement matching `filter`.
    ///
    /// The scan is stopped as soon as a match is reported.
    pub async fn find(
        &self,
        filter: &DiscoveryFilter,
        mode: ScanMode,
    ) -> Result<PeerDescriptor, SyncError> {
        info!(
            "Starting BLE scan for {} ({:?})",
            filter.name.as_deref().unwrap_or("any device"),
            mode
        );
        let started = Instant::now();
        let (sink, mut advertisements) = mpsc::unbounded_channel();
        self.transport.start_scan(sink).await?;

        let search = async {
            while let Some(peer) = advertisements.recv().await {
                if filter.matches(&peer) {
                    return Some(peer);
                }
                trace!("Ignoring advertisement from '{}' ({:#X})", peer.name, peer.address);
            }
            None
        };

        let found = match mode {
            ScanMode::Continuous => search.await,
            ScanMode::Timeout(window) => tokio::time::timeout(window, search).await.ok().flatten(),
        };

        self.transport.stop_scan().await;

        match found {
            Some(peer) => {
                info!(
                    "Found '{}' at {:#X} (RSSI {} dBm)",
                    peer.name, peer.address, peer.signal_strength
                );
                Ok(peer)
            }
            None => Err(SyncError::DiscoveryTimeout(started.elapsed())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Coordinate, PeerIdentity};
    use crate::infrastructure::bluetooth::loopback::LoopbackRadio;
    use crate::infrastructure::bluetooth::protocol::service_spec;

    fn descriptor(name: &str, service: &str) -> PeerDescriptor {
        PeerDescriptor {
            address: 1,
            name: name.to_string(),
            service_uuids: vec![service.to_string()],
            signal_strength: -60,
        }
    }

    #[test]
    fn test_filter_requires_name_and_service() {
        let settings = Settings::default();
        let filter = DiscoveryFilter::from_settings(&settings);

        assert!(filter.matches(&descriptor(&settings.publisher_name, &settings.service_uuid)));
        assert!(filter.matches(&descriptor(
            &settings.publisher_name,
            &settings.service_uuid.to_uppercase()
        )));
        assert!(!filter.matches(&descriptor("Someone Else", &settings.service_uuid)));
        assert!(!filter.matches(&descriptor(
            &settings.publisher_name,
            "0000180f-0000-1000-8000-00805f9b34fb"
        )));

        let any_name = DiscoveryFilter {
            name: None,
            ..filter
        };
        assert!(any_name.matches(&descriptor("Someone Else", &settings.service_uuid)));
    }

    #[tokio::test]
    async fn test_timeout_without_advertiser() {
        let radio = LoopbackRadio::new();
        let scanner = BleScanner::new(Arc::new(radio.endpoint().unwrap()));
        let filter = DiscoveryFilter::from_settings(&Settings::default());

        let result = scanner
            .find(&filter, ScanMode::Timeout(Duration::from_millis(50)))
            .await;
        assert!(matches!(result, Err(SyncError::DiscoveryTimeout(_))));
    }

    #[tokio::test]
    async fn test_skips_non_matching_and_finds_late_advertiser() {
        let settings = Settings::default();
        let radio = LoopbackRadio::new();
        let client = Arc::new(radio.endpoint().unwrap());
        let impostor = radio.endpoint().unwrap();
        let publisher = radio.endpoint().unwrap();

        impostor
            .advertise(
                &PeerIdentity {
                    service_uuid: settings.service_uuid.clone(),
                    name: "Impostor".to_string(),
                },
                &service_spec(&settings, Coordinate::ORIGIN),
            )
            .await
            .unwrap();

        let scanner = BleScanner::new(client);
        let filter = DiscoveryFilter::from_settings(&settings);
        let scan = tokio::spawn(async move { scanner.find(&filter, ScanMode::Continuous).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher
            .advertise(
                &settings.publisher_identity(),
                &service_spec(&settings, Coordinate::ORIGIN),
            )
            .await
            .unwrap();

        let found = tokio::time::timeout(Duration::from_secs(2), scan)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(found.address, publisher.address());
        assert_eq!(found.name, settings.publisher_name);
    }
}

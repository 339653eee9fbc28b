//! Process-wide registry of hub gateways
//!
//! The registry owns hub lifecycle (register, preregister, unregister) and
//! keeps a short-TTL copy of each hub's module directory so that the
//! resolver and enumeration see device online/offline transitions quickly
//! without hammering the hubs.

use axon_core::{
    parse_hub_url, AxonError, ErrorKind, HardwareId, HubDescriptor, HubId, HubState,
};
use axon_hub::{HubConnection, ModuleRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::AxonEvent;

/// One registered hub with its connection and cached directory
pub(crate) struct RegisteredHub {
    pub(crate) id: HubId,
    pub(crate) url: String,
    registered_at: DateTime<Utc>,
    state: RwLock<HubState>,
    pub(crate) connection: HubConnection,
    directory: RwLock<Option<DirectorySnapshot>>,
}

struct DirectorySnapshot {
    modules: Vec<ModuleRecord>,
    fetched_at: Instant,
}

impl RegisteredHub {
    async fn descriptor(&self) -> HubDescriptor {
        HubDescriptor {
            id: self.id.clone(),
            url: self.url.clone(),
            state: *self.state.read().await,
            registered_at: self.registered_at,
        }
    }
}

/// Registry of hub gateways, iterated in registration order
pub struct HubRegistry {
    hubs: RwLock<Vec<Arc<RegisteredHub>>>,
    timeout: Duration,
    directory_ttl: Duration,
    events: broadcast::Sender<AxonEvent>,
}

impl HubRegistry {
    pub(crate) fn new(
        timeout: Duration,
        directory_ttl: Duration,
        events: broadcast::Sender<AxonEvent>,
    ) -> Self {
        Self {
            hubs: RwLock::new(Vec::new()),
            timeout,
            directory_ttl,
            events,
        }
    }

    fn build_hub(&self, url: &str, state: HubState) -> Result<Arc<RegisteredHub>, AxonError> {
        let (id, normalized, credentials) = parse_hub_url(url)?;
        let mut connection = HubConnection::new(&normalized, self.timeout)
            .map_err(|e| AxonError::new(ErrorKind::UnreachableHub, e.to_string()))?;
        if let Some(credentials) = credentials {
            connection = connection.with_credentials(credentials);
        }
        Ok(Arc::new(RegisteredHub {
            id,
            url: normalized,
            registered_at: Utc::now(),
            state: RwLock::new(state),
            connection,
            directory: RwLock::new(None),
        }))
    }

    async fn insert(&self, hub: Arc<RegisteredHub>) -> Result<HubId, AxonError> {
        let mut hubs = self.hubs.write().await;
        if hubs.iter().any(|h| h.id == hub.id) {
            return Err(AxonError::new(
                ErrorKind::DuplicateHub,
                format!("hub already registered: {}", hub.url),
            ));
        }
        let id = hub.id.clone();
        hubs.push(hub);
        Ok(id)
    }

    /// Validate the URL, probe the hub, and store its descriptor
    pub async fn register(&self, url: &str) -> Result<HubId, AxonError> {
        let hub = self.build_hub(url, HubState::Registered)?;

        // Fail fast on duplicates before touching the network
        {
            let hubs = self.hubs.read().await;
            if hubs.iter().any(|h| h.id == hub.id) {
                return Err(AxonError::new(
                    ErrorKind::DuplicateHub,
                    format!("hub already registered: {}", hub.url),
                ));
            }
        }

        match hub.connection.probe().await {
            Ok(hub_info) => {
                info!(hub = %hub.url, serial = %hub_info.serial, "Registered hub");
            }
            Err(e) => {
                warn!(hub = %hub.url, error = %e, "Hub registration probe failed");
                return Err(AxonError::new(
                    ErrorKind::UnreachableHub,
                    format!("cannot contact hub at {}: {}", hub.url, e),
                ));
            }
        }

        let id = self.insert(hub).await?;
        let _ = self.events.send(AxonEvent::HubRegistered(id.clone()));
        Ok(id)
    }

    /// Store a hub without probing it; directory refreshes will pick it
    /// up once it answers
    pub async fn preregister(&self, url: &str) -> Result<HubId, AxonError> {
        let hub = self.build_hub(url, HubState::Unregistered)?;
        let url = hub.url.clone();
        let id = self.insert(hub).await?;
        info!(hub = %url, "Preregistered hub");
        Ok(id)
    }

    /// Remove one hub; true when it was present
    pub async fn unregister(&self, url: &str) -> Result<bool, AxonError> {
        let (id, _, _) = parse_hub_url(url)?;
        let mut hubs = self.hubs.write().await;
        let before = hubs.len();
        hubs.retain(|h| h.id != id);
        let removed = hubs.len() != before;
        if removed {
            info!(hub = %id, "Unregistered hub");
        }
        Ok(removed)
    }

    /// Clear every descriptor; idempotent
    pub async fn unregister_all(&self) {
        let mut hubs = self.hubs.write().await;
        if !hubs.is_empty() {
            info!(count = hubs.len(), "Unregistered all hubs");
        }
        hubs.clear();
    }

    pub async fn is_empty(&self) -> bool {
        self.hubs.read().await.is_empty()
    }

    /// Copy-on-read snapshot of descriptors, in registration order
    pub async fn list(&self) -> Vec<HubDescriptor> {
        let hubs = self.snapshot().await;
        let mut descriptors = Vec::with_capacity(hubs.len());
        for hub in hubs {
            descriptors.push(hub.descriptor().await);
        }
        descriptors
    }

    pub(crate) async fn snapshot(&self) -> Vec<Arc<RegisteredHub>> {
        self.hubs.read().await.clone()
    }

    /// Module directory of one hub, refreshed when older than the TTL
    pub(crate) async fn directory(
        &self,
        hub: &Arc<RegisteredHub>,
    ) -> Result<Vec<ModuleRecord>, AxonError> {
        {
            let directory = hub.directory.read().await;
            if let Some(snapshot) = directory.as_ref() {
                if snapshot.fetched_at.elapsed() < self.directory_ttl {
                    return Ok(snapshot.modules.clone());
                }
            }
        }

        let mut directory = hub.directory.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(snapshot) = directory.as_ref() {
            if snapshot.fetched_at.elapsed() < self.directory_ttl {
                return Ok(snapshot.modules.clone());
            }
        }

        match hub.connection.list_modules().await {
            Ok(modules) => {
                debug!(hub = %hub.id, modules = modules.len(), "Refreshed hub directory");
                *directory = Some(DirectorySnapshot {
                    modules: modules.clone(),
                    fetched_at: Instant::now(),
                });
                self.mark_state(hub, HubState::Registered).await;
                Ok(modules)
            }
            Err(e) => {
                debug!(hub = %hub.id, error = %e, "Directory refresh failed");
                self.mark_state(hub, HubState::Unreachable).await;
                Err(e.into())
            }
        }
    }

    async fn mark_state(&self, hub: &Arc<RegisteredHub>, new_state: HubState) {
        let mut state = hub.state.write().await;
        if *state != new_state {
            match new_state {
                HubState::Unreachable => {
                    warn!(hub = %hub.id, "Hub became unreachable");
                    let _ = self.events.send(AxonEvent::HubUnreachable(hub.id.clone()));
                }
                HubState::Registered => {
                    info!(hub = %hub.id, "Hub is reachable");
                }
                HubState::Unregistered => {}
            }
            *state = new_state;
        }
    }

    /// First registered hub whose directory lists the id's serial.
    ///
    /// When two hubs claim the same serial the first-registered hub wins;
    /// this is documented ambiguity resolution, not an error.
    pub async fn find_owning_hub(&self, hardware_id: &HardwareId) -> Option<HubId> {
        self.owning_hub(hardware_id).await.map(|h| h.id.clone())
    }

    pub(crate) async fn owning_hub(
        &self,
        hardware_id: &HardwareId,
    ) -> Option<Arc<RegisteredHub>> {
        for hub in self.snapshot().await {
            match self.directory(&hub).await {
                Ok(modules) => {
                    if modules.iter().any(|m| m.serial == hardware_id.serial()) {
                        return Some(hub);
                    }
                }
                // An unreachable hub cannot own anything right now
                Err(_) => continue,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{single_sensor, MockHub};

    fn registry() -> HubRegistry {
        let (events, _) = broadcast::channel(16);
        HubRegistry::new(Duration::from_secs(2), Duration::from_millis(50), events)
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let hub = MockHub::start("VHUB0001").await;
        let registry = registry();

        let id = registry.register(&hub.url).await.unwrap();
        assert_eq!(id.as_str(), hub.url);

        let descriptors = registry.list().await;
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].state, HubState::Registered);
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let hub = MockHub::start("VHUB0001").await;
        let registry = registry();

        registry.register(&hub.url).await.unwrap();
        // Same hub with a trailing slash still normalizes to a duplicate
        let err = registry
            .register(&format!("{}/", hub.url))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateHub);
    }

    #[tokio::test]
    async fn test_register_unreachable() {
        let registry = registry();
        let err = registry.register("http://127.0.0.1:1/").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreachableHub);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_url() {
        let registry = registry();
        let err = registry.register("not a url").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_preregister_skips_probe() {
        let registry = registry();
        // Nothing listens here, but preregistration succeeds anyway
        registry.preregister("http://127.0.0.1:1/").await.unwrap();
        let descriptors = registry.list().await;
        assert_eq!(descriptors[0].state, HubState::Unregistered);
    }

    #[tokio::test]
    async fn test_unregister_all_idempotent() {
        let hub = MockHub::start("VHUB0001").await;
        let registry = registry();
        registry.register(&hub.url).await.unwrap();

        registry.unregister_all().await;
        registry.unregister_all().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_owning_hub_first_registered_wins() {
        // Two hubs both report a module with the same serial
        let (modules_a, attrs_a) = single_sensor("ABCD1234", "lightSensor1", "LightSensor", "");
        let (modules_b, attrs_b) = single_sensor("ABCD1234", "lightSensor1", "LightSensor", "");
        let hub_a = MockHub::start_with("VHUB000A", modules_a, attrs_a).await;
        let hub_b = MockHub::start_with("VHUB000B", modules_b, attrs_b).await;

        let registry = registry();
        let id_a = registry.register(&hub_a.url).await.unwrap();
        registry.register(&hub_b.url).await.unwrap();

        let hardware_id = HardwareId::new("ABCD1234", "lightSensor1");
        let owner = registry.find_owning_hub(&hardware_id).await.unwrap();
        assert_eq!(owner, id_a);

        // Consistent across repeated calls with unchanged topology
        let owner = registry.find_owning_hub(&hardware_id).await.unwrap();
        assert_eq!(owner, id_a);
    }

    #[tokio::test]
    async fn test_unreachable_hub_marked() {
        let hub = MockHub::start("VHUB0001").await;
        let registry = registry();
        registry.register(&hub.url).await.unwrap();

        hub.stop();
        // Directory TTL is 50ms; wait it out so the next lookup refetches
        tokio::time::sleep(Duration::from_millis(60)).await;

        let hardware_id = HardwareId::new("ABCD1234", "lightSensor1");
        assert!(registry.find_owning_hub(&hardware_id).await.is_none());
        let descriptors = registry.list().await;
        assert_eq!(descriptors[0].state, HubState::Unreachable);
    }
}

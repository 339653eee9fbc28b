//! Time-bounded attribute cache with fetch coalescing
//!
//! One entry per function key holds the last retrieved snapshot. Reads of
//! an unexpired snapshot take a shared lock only; an expired or missing
//! snapshot is refreshed by exactly one fetch. Concurrent callers wait on
//! the entry's fetch lock and share the winner's outcome, value or error,
//! instead of issuing duplicate requests.

use axon_core::{AttrValue, AttributeSnapshot, AxonError, ErrorKind, FunctionKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, trace};

use crate::registry::HubRegistry;
use crate::AxonEvent;

/// Attribute carrying the short advertised form of a function's state;
/// changes to it drive the value-change notification hook
pub const ADVERTISED_VALUE: &str = "advertisedValue";

struct CacheEntry {
    snapshot: RwLock<Option<AttributeSnapshot>>,
    /// Serializes refreshes of this entry and records the most recent
    /// refresh failure, so coalesced waiters can share it
    fetch_lock: Mutex<Option<AxonError>>,
    /// Bumped after every completed refresh attempt; lets a waiter tell
    /// whether a refresh finished while it was queued on the lock
    generation: AtomicU64,
}

/// Shared attribute cache for every proxy in the runtime
pub struct FunctionCache {
    registry: Arc<HubRegistry>,
    entries: RwLock<HashMap<FunctionKey, Arc<CacheEntry>>>,
    events: broadcast::Sender<AxonEvent>,
}

impl FunctionCache {
    pub(crate) fn new(registry: Arc<HubRegistry>, events: broadcast::Sender<AxonEvent>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    async fn entry(&self, key: &FunctionKey) -> Arc<CacheEntry> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                return entry.clone();
            }
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(CacheEntry {
                    snapshot: RwLock::new(None),
                    fetch_lock: Mutex::new(None),
                    generation: AtomicU64::new(0),
                })
            })
            .clone()
    }

    /// Cached value if fresh, otherwise a single coalesced fetch.
    ///
    /// A failed refresh leaves any previous snapshot untouched, so callers
    /// holding stale data keep it.
    pub async fn get(
        &self,
        key: &FunctionKey,
        attribute: &str,
        max_age: Duration,
    ) -> Result<AttrValue, AxonError> {
        let entry = self.entry(key).await;

        if let Some(value) = read_fresh(&entry, attribute).await {
            trace!(function = %key, attribute = attribute, "Cache hit");
            return value_or_missing(value, key, attribute);
        }

        // Expired or missing: whoever gets the fetch lock refreshes, late
        // arrivals ride on the outcome of the refresh that completed
        // while they were queued
        let observed = entry.generation.load(Ordering::SeqCst);
        let mut last_failure = entry.fetch_lock.lock().await;

        if let Some(value) = read_fresh(&entry, attribute).await {
            trace!(function = %key, attribute = attribute, "Coalesced onto completed fetch");
            return value_or_missing(value, key, attribute);
        }
        if entry.generation.load(Ordering::SeqCst) != observed {
            if let Some(err) = last_failure.clone() {
                trace!(function = %key, "Sharing coalesced fetch failure");
                return Err(err);
            }
            // The refresh succeeded but already expired (tiny max_age);
            // fall through and fetch ourselves
        }

        match self.fetch_snapshot(key).await {
            Ok(attributes) => {
                *last_failure = None;
                let refreshed = AttributeSnapshot::new(attributes, max_age);
                let value = refreshed.get(attribute).cloned();
                {
                    let mut snapshot = entry.snapshot.write().await;
                    self.notify_value_change(key, snapshot.as_ref(), &refreshed);
                    *snapshot = Some(refreshed);
                }
                entry.generation.fetch_add(1, Ordering::SeqCst);
                value_or_missing(value, key, attribute)
            }
            Err(e) => {
                *last_failure = Some(e.clone());
                entry.generation.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(
        &self,
        key: &FunctionKey,
    ) -> Result<HashMap<String, AttrValue>, AxonError> {
        if self.registry.is_empty().await {
            return Err(AxonError::new(
                ErrorKind::NoHubRegistered,
                "no hub registered",
            ));
        }

        let hub = self
            .registry
            .owning_hub(&key.hardware_id)
            .await
            .ok_or_else(|| {
                AxonError::new(ErrorKind::Offline, format!("{} is not online", key))
            })?;

        match hub.connection.fetch_attributes(&key.hardware_id).await {
            Ok(attributes) => Ok(attributes),
            Err(e) => {
                debug!(function = %key, hub = %hub.id, error = %e, "Snapshot fetch failed");
                Err(e.into())
            }
        }
    }

    fn notify_value_change(
        &self,
        key: &FunctionKey,
        old: Option<&AttributeSnapshot>,
        new: &AttributeSnapshot,
    ) {
        let Some(value) = new.get(ADVERTISED_VALUE) else {
            return;
        };
        if old.and_then(|s| s.get(ADVERTISED_VALUE)) != Some(value) {
            let _ = self.events.send(AxonEvent::ValueChanged {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }

    /// Write one attribute through to the owning hub, then update the
    /// cached snapshot in place with the known new value
    pub async fn write(
        &self,
        key: &FunctionKey,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), AxonError> {
        if self.registry.is_empty().await {
            return Err(AxonError::new(
                ErrorKind::NoHubRegistered,
                "no hub registered",
            ));
        }

        let hub = self
            .registry
            .owning_hub(&key.hardware_id)
            .await
            .ok_or_else(|| {
                AxonError::new(ErrorKind::Offline, format!("{} is not online", key))
            })?;

        hub.connection
            .write_attribute(&key.hardware_id, attribute, &value)
            .await?;

        self.apply_write(key, attribute, value).await;
        Ok(())
    }

    /// Optimistic in-place update after a successful write
    pub async fn apply_write(&self, key: &FunctionKey, attribute: &str, value: AttrValue) {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(key) {
            let mut snapshot = entry.snapshot.write().await;
            if let Some(snapshot) = snapshot.as_mut() {
                snapshot.set(attribute, value);
            }
        }
    }

    /// Force the next get to refetch regardless of expiry
    pub async fn invalidate(&self, key: &FunctionKey) {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(key) {
            let mut snapshot = entry.snapshot.write().await;
            if let Some(snapshot) = snapshot.as_mut() {
                snapshot.expire();
            }
        }
    }

    /// Last-known attributes regardless of freshness
    pub async fn cached(&self, key: &FunctionKey) -> Option<HashMap<String, AttrValue>> {
        let entry = {
            let entries = self.entries.read().await;
            entries.get(key)?.clone()
        };
        let snapshot = entry.snapshot.read().await;
        snapshot.as_ref().map(|s| s.attributes().clone())
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

async fn read_fresh(entry: &CacheEntry, attribute: &str) -> Option<Option<AttrValue>> {
    let snapshot = entry.snapshot.read().await;
    match snapshot.as_ref() {
        Some(s) if s.is_fresh() => Some(s.get(attribute).cloned()),
        _ => None,
    }
}

fn value_or_missing(
    value: Option<AttrValue>,
    key: &FunctionKey,
    attribute: &str,
) -> Result<AttrValue, AxonError> {
    value.ok_or_else(|| {
        AxonError::new(
            ErrorKind::InvalidArgument,
            format!("{} has no attribute {:?}", key, attribute),
        )
    })
}

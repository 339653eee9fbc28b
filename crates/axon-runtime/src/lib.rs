//! Axon Runtime - the client runtime for hub-attached device functions
//!
//! This crate ties the runtime layer together:
//! - [`HubRegistry`] tracks registered gateways and their directories
//! - [`FunctionResolver`] maps user identifiers to hardware ids
//! - [`FunctionCache`] keeps time-bounded attribute snapshots per function
//! - [`ProxyFactory`]/[`FunctionProxy`] give callers one stable handle per
//!   function, with typed accessors
//! - [`ErrorReporter`] decides how failures are signaled
//!
//! The [`Axon`] handle owns all of the above and is cheap to clone.

pub mod cache;
pub mod classes;
pub mod proxy;
pub mod registry;
pub mod reporter;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::FunctionCache;
pub use classes::{LightSensor, PowerMeter, RangeFinder};
pub use proxy::{FunctionProxy, ProxyFactory};
pub use registry::HubRegistry;
pub use reporter::{ErrorMode, ErrorReporter};
pub use resolver::{FunctionResolver, Resolved};

use axon_core::{
    AttrValue, AxonError, ClassSchema, FunctionKey, HardwareId, HubDescriptor, HubId,
    SchemaRegistry, INVALID_STRING, SUCCESS,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Per-request timeout for hub exchanges, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a fetched attribute snapshot stays fresh
    #[serde(default = "default_cache_validity_ms")]
    pub cache_validity_ms: u64,
    /// How long a hub's module directory stays fresh
    #[serde(default = "default_directory_ttl_ms")]
    pub directory_ttl_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            cache_validity_ms: default_cache_validity_ms(),
            directory_ttl_ms: default_directory_ttl_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_cache_validity_ms() -> u64 {
    5
}

fn default_directory_ttl_ms() -> u64 {
    500
}

/// Runtime event for subscribers
#[derive(Debug, Clone)]
pub enum AxonEvent {
    /// A hub passed its registration probe
    HubRegistered(HubId),
    /// A registered hub stopped answering
    HubUnreachable(HubId),
    /// A refreshed snapshot changed a function's advertised value
    ValueChanged { key: FunctionKey, value: AttrValue },
}

/// Shared internals behind every [`Axon`] clone and every proxy
pub(crate) struct Shared {
    pub(crate) registry: Arc<HubRegistry>,
    pub(crate) resolver: FunctionResolver,
    pub(crate) cache: FunctionCache,
    pub(crate) factory: ProxyFactory,
    pub(crate) reporter: ErrorReporter,
    pub(crate) schemas: std::sync::RwLock<SchemaRegistry>,
    cache_validity_ms: AtomicU64,
    events: broadcast::Sender<AxonEvent>,
}

impl Shared {
    pub(crate) fn cache_validity(&self) -> Duration {
        Duration::from_millis(self.cache_validity_ms.load(Ordering::Relaxed))
    }

    /// Whether the schema marks the attribute writable; `None` when the
    /// class or attribute is not described
    pub(crate) fn attribute_writable(&self, class_name: &str, attribute: &str) -> Option<bool> {
        let schemas = self.schemas.read().unwrap();
        schemas
            .get(class_name)
            .and_then(|s| s.attribute(attribute))
            .map(|a| a.writable)
    }
}

/// Root handle of the Axon runtime
#[derive(Clone)]
pub struct Axon {
    pub(crate) inner: Arc<Shared>,
}

impl Axon {
    pub fn new(config: RuntimeConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let registry = Arc::new(HubRegistry::new(
            Duration::from_millis(config.request_timeout_ms),
            Duration::from_millis(config.directory_ttl_ms),
            events.clone(),
        ));

        let inner = Arc::new(Shared {
            resolver: FunctionResolver::new(registry.clone()),
            cache: FunctionCache::new(registry.clone(), events.clone()),
            factory: ProxyFactory::new(),
            reporter: ErrorReporter::new(ErrorMode::RaiseOnError),
            schemas: std::sync::RwLock::new(SchemaRegistry::builtin()),
            cache_validity_ms: AtomicU64::new(config.cache_validity_ms),
            registry,
            events,
        });

        Self { inner }
    }

    /// Register a hub after a successful liveness probe.
    ///
    /// Returns [`SUCCESS`] or, per the error mode, the failure's negative
    /// status code.
    pub async fn register_hub(&self, url: &str) -> Result<i32, AxonError> {
        match self.inner.registry.register(url).await {
            Ok(_) => Ok(SUCCESS),
            Err(e) => {
                let code = e.code();
                self.inner.reporter.report(e, code)
            }
        }
    }

    /// Store a hub without probing it; it may come online later
    pub async fn preregister_hub(&self, url: &str) -> Result<i32, AxonError> {
        match self.inner.registry.preregister(url).await {
            Ok(_) => Ok(SUCCESS),
            Err(e) => {
                let code = e.code();
                self.inner.reporter.report(e, code)
            }
        }
    }

    /// Remove one hub; true when it was present
    pub async fn unregister_hub(&self, url: &str) -> Result<bool, AxonError> {
        self.inner.registry.unregister(url).await
    }

    /// Drop every hub and every cached snapshot. Idempotent; subsequent
    /// resolver and cache calls fail with `NoHubRegistered` until a hub
    /// is registered again.
    pub async fn unregister_all(&self) {
        self.inner.registry.unregister_all().await;
        self.inner.cache.clear().await;
    }

    pub async fn list_hubs(&self) -> Vec<HubDescriptor> {
        self.inner.registry.list().await
    }

    /// Singleton proxy per (class, identifier); the function does not
    /// need to be online
    pub async fn find_or_create(&self, class_name: &str, identifier: &str) -> Arc<FunctionProxy> {
        self.inner
            .factory
            .find_or_create(&self.inner, class_name, identifier)
            .await
    }

    /// Resolve an identifier to its class and hardware id
    pub async fn resolve(&self, identifier: &str) -> Result<Resolved, AxonError> {
        self.inner.resolver.resolve(identifier).await
    }

    /// Resolve an identifier to its hardware id string, honoring the
    /// error-mode contract ([`INVALID_STRING`] in return-code mode)
    pub async fn resolve_hardware_id(&self, identifier: &str) -> Result<String, AxonError> {
        match self.inner.resolver.resolve(identifier).await {
            Ok(resolved) => Ok(resolved.hardware_id.to_string()),
            Err(e) => self.inner.reporter.report(e, INVALID_STRING.to_string()),
        }
    }

    /// First online function of a class, in enumeration order
    pub async fn first_hardware_id(
        &self,
        class_name: &str,
    ) -> Result<Option<HardwareId>, AxonError> {
        self.inner.resolver.first_hardware_id(class_name).await
    }

    /// Next online function of a class after the given one
    pub async fn next_hardware_id(
        &self,
        class_name: &str,
        after: &HardwareId,
    ) -> Result<Option<HardwareId>, AxonError> {
        self.inner.resolver.next_hardware_id(class_name, after).await
    }

    /// All online functions of a class, in enumeration order
    pub async fn enumerate(&self, class_name: &str) -> Result<Vec<HardwareId>, AxonError> {
        self.inner.resolver.enumerate(class_name).await
    }

    pub fn set_error_mode(&self, mode: ErrorMode) {
        self.inner.reporter.set_mode(mode);
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.inner.reporter.mode()
    }

    /// Most recent failure recorded by the reporter
    pub fn last_error(&self) -> Option<AxonError> {
        self.inner.reporter.last_error()
    }

    pub fn set_cache_validity(&self, validity: Duration) {
        self.inner
            .cache_validity_ms
            .store(validity.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn cache_validity(&self) -> Duration {
        self.inner.cache_validity()
    }

    /// Register a schema for a function class (generated bindings call
    /// this at startup)
    pub fn register_schema(&self, schema: ClassSchema) {
        self.inner.schemas.write().unwrap().register(schema);
    }

    /// Subscribe to runtime events
    pub fn subscribe(&self) -> broadcast::Receiver<AxonEvent> {
        self.inner.events.subscribe()
    }

    /// Direct access to the attribute cache
    pub fn cache(&self) -> &FunctionCache {
        &self.inner.cache
    }

    /// Direct access to the hub registry
    pub fn registry(&self) -> &HubRegistry {
        &self.inner.registry
    }
}

impl Default for Axon {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

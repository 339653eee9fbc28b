//! Function proxies and the proxy object cache
//!
//! A proxy owns no network state: it carries its class name, the
//! identifier it was created with, and a weak handle to the shared
//! runtime. Everything else is delegated to the resolver and the cache by
//! function key, so proxies stay valid while the function is offline and
//! are safe to share across tasks.

use axon_core::{
    AttrValue, AxonError, ErrorKind, FunctionKey, INVALID_FLOAT, INVALID_INT, INVALID_STRING,
    SUCCESS,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cache::ADVERTISED_VALUE;
use crate::resolver::Resolved;
use crate::{Axon, Shared};

/// Object cache handing out one proxy per (class, identifier)
pub struct ProxyFactory {
    proxies: Mutex<HashMap<(String, String), Arc<FunctionProxy>>>,
}

impl ProxyFactory {
    pub(crate) fn new() -> Self {
        Self {
            proxies: Mutex::new(HashMap::new()),
        }
    }

    /// Same arguments always return the same instance
    pub(crate) async fn find_or_create(
        &self,
        shared: &Arc<Shared>,
        class_name: &str,
        identifier: &str,
    ) -> Arc<FunctionProxy> {
        let mut proxies = self.proxies.lock().await;
        proxies
            .entry((class_name.to_string(), identifier.to_string()))
            .or_insert_with(|| {
                Arc::new(FunctionProxy {
                    class_name: class_name.to_string(),
                    identifier: identifier.to_string(),
                    runtime: Arc::downgrade(shared),
                })
            })
            .clone()
    }
}

/// Stable handle to one device function
pub struct FunctionProxy {
    class_name: String,
    identifier: String,
    runtime: Weak<Shared>,
}

impl FunctionProxy {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    fn shared(&self) -> Result<Arc<Shared>, AxonError> {
        self.runtime.upgrade().ok_or_else(|| {
            AxonError::new(ErrorKind::InvalidArgument, "runtime has been dropped")
        })
    }

    pub(crate) fn runtime_handle(&self) -> Result<Axon, AxonError> {
        Ok(Axon {
            inner: self.shared()?,
        })
    }

    /// Resolve this proxy's identifier to its concrete hardware id
    pub async fn resolve(&self) -> Result<Resolved, AxonError> {
        let shared = self.shared()?;
        shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await
    }

    fn key(&self, resolved: &Resolved) -> FunctionKey {
        FunctionKey::new(self.class_name.clone(), resolved.hardware_id.clone())
    }

    /// Whether the function is currently reachable; never fails
    pub async fn is_online(&self) -> bool {
        let Ok(shared) = self.shared() else {
            return false;
        };
        let Ok(resolved) = shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await
        else {
            return false;
        };
        shared
            .cache
            .get(&self.key(&resolved), ADVERTISED_VALUE, shared.cache_validity())
            .await
            .is_ok()
    }

    /// Resolved hardware id, or [`INVALID_STRING`] per the error mode
    pub async fn hardware_id(&self) -> Result<String, AxonError> {
        let shared = self.shared()?;
        match shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await
        {
            Ok(resolved) => Ok(resolved.hardware_id.to_string()),
            Err(e) => shared.reporter.report(e, INVALID_STRING.to_string()),
        }
    }

    /// `Class(identifier)=hardwareId`, or `=unresolved` while offline
    pub async fn describe(&self) -> String {
        let resolved = match self.shared() {
            Ok(shared) => shared
                .resolver
                .resolve_class(&self.class_name, &self.identifier)
                .await
                .ok(),
            Err(_) => None,
        };
        match resolved {
            Some(r) => format!("{}({})={}", self.class_name, self.identifier, r.hardware_id),
            None => format!("{}({})=unresolved", self.class_name, self.identifier),
        }
    }

    /// Raw cached read, outside the error-mode contract
    pub async fn get_attr(&self, name: &str) -> Result<AttrValue, AxonError> {
        let shared = self.shared()?;
        let resolved = shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await?;
        shared
            .cache
            .get(&self.key(&resolved), name, shared.cache_validity())
            .await
    }

    /// String attribute, or [`INVALID_STRING`] per the error mode
    pub async fn get_string(&self, name: &str) -> Result<String, AxonError> {
        let shared = self.shared()?;
        match self.get_attr(name).await {
            Ok(value) => Ok(value.as_string()),
            Err(e) => shared.reporter.report(e, INVALID_STRING.to_string()),
        }
    }

    /// Integer attribute, or [`INVALID_INT`] per the error mode
    pub async fn get_int(&self, name: &str) -> Result<i64, AxonError> {
        let shared = self.shared()?;
        match self.get_attr(name).await {
            Ok(value) => match value.as_i64() {
                Some(i) => Ok(i),
                None => shared.reporter.report(
                    AxonError::new(
                        ErrorKind::MalformedResponse,
                        format!("attribute {:?} is not an integer: {}", name, value),
                    ),
                    INVALID_INT,
                ),
            },
            Err(e) => shared.reporter.report(e, INVALID_INT),
        }
    }

    /// Float attribute, or [`INVALID_FLOAT`] per the error mode
    pub async fn get_float(&self, name: &str) -> Result<f64, AxonError> {
        let shared = self.shared()?;
        match self.get_attr(name).await {
            Ok(value) => match value.as_f64() {
                Some(f) => Ok(f),
                None => shared.reporter.report(
                    AxonError::new(
                        ErrorKind::MalformedResponse,
                        format!("attribute {:?} is not a number: {}", name, value),
                    ),
                    INVALID_FLOAT,
                ),
            },
            Err(e) => shared.reporter.report(e, INVALID_FLOAT),
        }
    }

    /// Write one attribute through to the hub. Returns [`SUCCESS`] or,
    /// per the error mode, the failure's negative status code.
    pub async fn set_attr(&self, name: &str, value: AttrValue) -> Result<i32, AxonError> {
        let shared = self.shared()?;

        if shared.attribute_writable(&self.class_name, name) == Some(false) {
            let err = AxonError::new(
                ErrorKind::WriteRejected,
                format!("attribute {:?} of {} is read-only", name, self.class_name),
            );
            let code = err.code();
            return shared.reporter.report(err, code);
        }

        let result = async {
            let resolved = shared
                .resolver
                .resolve_class(&self.class_name, &self.identifier)
                .await?;
            shared.cache.write(&self.key(&resolved), name, value).await
        }
        .await;

        match result {
            Ok(()) => Ok(SUCCESS),
            Err(e) => {
                let code = e.code();
                shared.reporter.report(e, code)
            }
        }
    }

    /// Refresh (if stale) and return the full last-known snapshot
    pub async fn load(&self, max_age: Duration) -> Result<HashMap<String, AttrValue>, AxonError> {
        let shared = self.shared()?;
        let resolved = shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await?;
        let key = self.key(&resolved);
        shared.cache.get(&key, ADVERTISED_VALUE, max_age).await?;
        Ok(shared.cache.cached(&key).await.unwrap_or_default())
    }

    /// Drop the cached snapshot so the next read refetches
    pub async fn invalidate(&self) -> Result<(), AxonError> {
        let shared = self.shared()?;
        let resolved = shared
            .resolver
            .resolve_class(&self.class_name, &self.identifier)
            .await?;
        shared.cache.invalidate(&self.key(&resolved)).await;
        Ok(())
    }
}

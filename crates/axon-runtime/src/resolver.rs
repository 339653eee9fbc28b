//! Identifier resolution and stable enumeration
//!
//! Identifiers come in several forms: a bare function logical name, or
//! `<module>.<function>` where the module part is a serial number or a
//! module logical name and the function part is a hardware function id or
//! a function logical name. Lookups are first-match-wins in hub
//! registration order; ambiguity between duplicate logical names is
//! resolved silently, as the hubs themselves document it.

use axon_core::{AxonError, ErrorKind, HardwareId};
use axon_hub::{FunctionRecord, ModuleRecord};
use std::sync::Arc;
use tracing::trace;

use crate::registry::HubRegistry;

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub class_name: String,
    pub hardware_id: HardwareId,
}

/// Maps user-supplied identifiers to concrete hardware ids
pub struct FunctionResolver {
    registry: Arc<HubRegistry>,
}

impl FunctionResolver {
    pub(crate) fn new(registry: Arc<HubRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve an identifier against every registered hub
    pub async fn resolve(&self, identifier: &str) -> Result<Resolved, AxonError> {
        self.resolve_impl(identifier, None).await
    }

    /// Resolve an identifier; the match must belong to the given class
    pub async fn resolve_class(
        &self,
        class_name: &str,
        identifier: &str,
    ) -> Result<Resolved, AxonError> {
        self.resolve_impl(identifier, Some(class_name)).await
    }

    async fn resolve_impl(
        &self,
        identifier: &str,
        class: Option<&str>,
    ) -> Result<Resolved, AxonError> {
        if self.registry.is_empty().await {
            return Err(AxonError::new(
                ErrorKind::NoHubRegistered,
                "no hub registered",
            ));
        }

        // Directories of reachable hubs, in registration order
        let mut directories: Vec<Vec<ModuleRecord>> = Vec::new();
        for hub in self.registry.snapshot().await {
            if let Ok(modules) = self.registry.directory(&hub).await {
                directories.push(modules);
            }
        }

        let found = match identifier.split_once('.') {
            Some((module_part, function_part))
                if !module_part.is_empty() && !function_part.is_empty() =>
            {
                // Module by serial first, then by logical name
                let module = directories
                    .iter()
                    .flatten()
                    .find(|m| m.serial == module_part)
                    .or_else(|| {
                        directories.iter().flatten().find(|m| {
                            !m.logical_name.is_empty() && m.logical_name == module_part
                        })
                    });
                module.and_then(|m| find_function(m, function_part, class).map(|f| (m, f)))
            }
            _ => {
                // Bare function logical name, searched across every module
                directories.iter().flatten().find_map(|m| {
                    m.functions
                        .iter()
                        .find(|f| {
                            class_matches(f, class)
                                && !f.logical_name.is_empty()
                                && f.logical_name == identifier
                        })
                        .map(|f| (m, f))
                })
            }
        };

        match found {
            Some((module, function)) => {
                let resolved = Resolved {
                    class_name: function.class.clone(),
                    hardware_id: HardwareId::new(&module.serial, &function.func_id),
                };
                trace!(identifier = identifier, hardware_id = %resolved.hardware_id, "Resolved function");
                Ok(resolved)
            }
            // Expected steady state: the device may simply be unplugged
            None => Err(AxonError::new(
                ErrorKind::UnknownFunction,
                format!("no online function matches {:?}", identifier),
            )),
        }
    }

    /// Hardware ids of every online function of a class, in hub
    /// registration order then per-hub directory order. The order is
    /// stable across calls while the topology is unchanged.
    pub async fn enumerate(&self, class_name: &str) -> Result<Vec<HardwareId>, AxonError> {
        if self.registry.is_empty().await {
            return Err(AxonError::new(
                ErrorKind::NoHubRegistered,
                "no hub registered",
            ));
        }

        let mut ids = Vec::new();
        for hub in self.registry.snapshot().await {
            let Ok(modules) = self.registry.directory(&hub).await else {
                continue;
            };
            for module in &modules {
                for function in &module.functions {
                    if function.class == class_name {
                        ids.push(HardwareId::new(&module.serial, &function.func_id));
                    }
                }
            }
        }
        Ok(ids)
    }

    /// First id of the enumeration sequence
    pub async fn first_hardware_id(
        &self,
        class_name: &str,
    ) -> Result<Option<HardwareId>, AxonError> {
        Ok(self.enumerate(class_name).await?.into_iter().next())
    }

    /// Id following `after` in the enumeration sequence; `None` when
    /// `after` is last or no longer online
    pub async fn next_hardware_id(
        &self,
        class_name: &str,
        after: &HardwareId,
    ) -> Result<Option<HardwareId>, AxonError> {
        let ids = self.enumerate(class_name).await?;
        Ok(ids
            .iter()
            .position(|id| id == after)
            .and_then(|i| ids.get(i + 1))
            .cloned())
    }
}

fn class_matches(function: &FunctionRecord, class: Option<&str>) -> bool {
    class.map(|c| function.class == c).unwrap_or(true)
}

/// Function id first, then function logical name
fn find_function<'a>(
    module: &'a ModuleRecord,
    function_part: &str,
    class: Option<&str>,
) -> Option<&'a FunctionRecord> {
    module
        .functions
        .iter()
        .find(|f| class_matches(f, class) && f.func_id == function_part)
        .or_else(|| {
            module.functions.iter().find(|f| {
                class_matches(f, class)
                    && !f.logical_name.is_empty()
                    && f.logical_name == function_part
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{module, sensor_attributes, MockHub};
    use crate::{Axon, RuntimeConfig};
    use std::collections::HashMap;

    async fn fixture() -> (Axon, MockHub) {
        // One hub, two modules:
        //   ABCD1234 "garage":  lightSensor1 "ceiling", rangeFinder1
        //   EFGH5678 "porch":   lightSensor1 "outside"
        let modules = vec![
            module(
                "ABCD1234",
                "garage",
                &[
                    ("lightSensor1", "LightSensor", "ceiling"),
                    ("rangeFinder1", "RangeFinder", ""),
                ],
            ),
            module("EFGH5678", "porch", &[("lightSensor1", "LightSensor", "outside")]),
        ];
        let mut attributes = HashMap::new();
        attributes.insert(
            "ABCD1234.lightSensor1".to_string(),
            sensor_attributes("ceiling", "810", "lx", 810.5),
        );
        attributes.insert(
            "ABCD1234.rangeFinder1".to_string(),
            sensor_attributes("", "122", "mm", 122.0),
        );
        attributes.insert(
            "EFGH5678.lightSensor1".to_string(),
            sensor_attributes("outside", "95", "lx", 95.0),
        );

        let hub = MockHub::start_with("VHUB0001", modules, attributes).await;
        let axon = Axon::new(RuntimeConfig::default());
        axon.register_hub(&hub.url).await.unwrap();
        (axon, hub)
    }

    #[tokio::test]
    async fn test_resolve_serial_and_func_id() {
        let (axon, _hub) = fixture().await;
        let resolved = axon.resolve("ABCD1234.lightSensor1").await.unwrap();
        assert_eq!(resolved.class_name, "LightSensor");
        assert_eq!(resolved.hardware_id.as_str(), "ABCD1234.lightSensor1");
    }

    #[tokio::test]
    async fn test_resolve_serial_and_logical_name() {
        let (axon, _hub) = fixture().await;
        let resolved = axon.resolve("ABCD1234.ceiling").await.unwrap();
        assert_eq!(resolved.hardware_id.as_str(), "ABCD1234.lightSensor1");
    }

    #[tokio::test]
    async fn test_resolve_module_logical_name() {
        let (axon, _hub) = fixture().await;
        let resolved = axon.resolve("porch.lightSensor1").await.unwrap();
        assert_eq!(resolved.hardware_id.as_str(), "EFGH5678.lightSensor1");
    }

    #[tokio::test]
    async fn test_resolve_bare_logical_name() {
        let (axon, _hub) = fixture().await;
        let resolved = axon.resolve("outside").await.unwrap();
        assert_eq!(resolved.hardware_id.as_str(), "EFGH5678.lightSensor1");
        // A bare hardware function id is not matched
        let err = axon.resolve("rangeFinder1").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFunction);
    }

    #[tokio::test]
    async fn test_resolve_class_filter() {
        let (axon, _hub) = fixture().await;
        let resolver = &axon.inner.resolver;
        let resolved = resolver
            .resolve_class("RangeFinder", "ABCD1234.rangeFinder1")
            .await
            .unwrap();
        assert_eq!(resolved.class_name, "RangeFinder");

        // The right id under the wrong class does not resolve
        let err = resolver
            .resolve_class("RangeFinder", "ABCD1234.lightSensor1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFunction);
    }

    #[tokio::test]
    async fn test_resolve_unknown_function() {
        let (axon, _hub) = fixture().await;
        let err = axon.resolve("nonexistent.sensor").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFunction);
    }

    #[tokio::test]
    async fn test_duplicate_logical_name_first_hub_wins() {
        // The same logical name "door" on two hubs; the first-registered
        // hub's function must win, consistently
        let modules_a = vec![module(
            "AAAA0001",
            "",
            &[("lightSensor1", "LightSensor", "door")],
        )];
        let modules_b = vec![module(
            "BBBB0002",
            "",
            &[("lightSensor1", "LightSensor", "door")],
        )];
        let hub_a = MockHub::start_with("VHUB000A", modules_a, HashMap::new()).await;
        let hub_b = MockHub::start_with("VHUB000B", modules_b, HashMap::new()).await;

        let axon = Axon::new(RuntimeConfig::default());
        axon.register_hub(&hub_a.url).await.unwrap();
        axon.register_hub(&hub_b.url).await.unwrap();

        for _ in 0..3 {
            let resolved = axon.resolve("door").await.unwrap();
            assert_eq!(resolved.hardware_id.as_str(), "AAAA0001.lightSensor1");
        }
    }

    #[tokio::test]
    async fn test_enumeration_stable_and_complete() {
        let (axon, _hub) = fixture().await;

        let ids = axon.enumerate("LightSensor").await.unwrap();
        assert_eq!(
            ids.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
            vec!["ABCD1234.lightSensor1", "EFGH5678.lightSensor1"]
        );

        // Stable across repeated calls with unchanged topology
        assert_eq!(axon.enumerate("LightSensor").await.unwrap(), ids);
    }

    #[tokio::test]
    async fn test_first_next_walks_every_id_once() {
        let (axon, _hub) = fixture().await;

        let mut walked = Vec::new();
        let mut current = axon.first_hardware_id("LightSensor").await.unwrap();
        while let Some(id) = current {
            walked.push(id.clone());
            current = axon.next_hardware_id("LightSensor", &id).await.unwrap();
        }

        assert_eq!(walked, axon.enumerate("LightSensor").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_hub_registered() {
        let axon = Axon::new(RuntimeConfig::default());
        let err = axon.resolve("anything").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoHubRegistered);
        let err = axon.enumerate("LightSensor").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoHubRegistered);
    }
}

//! Function class schemas
//!
//! One schema record per function class replaces the original per-class
//! proxy hierarchy: the generic proxy consults the schema for attribute
//! typing and writability, and generated bindings register their own
//! schemas at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire-level type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    Str,
    Int,
    Float,
    Bool,
}

/// One attribute of a function class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: AttrKind,
    pub writable: bool,
}

/// Attribute surface of one function class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSchema {
    pub class_name: String,
    pub attributes: Vec<AttributeSpec>,
}

impl ClassSchema {
    /// Start a schema with the attributes every function class carries
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            attributes: Vec::new(),
        }
        .attr("logicalName", AttrKind::Str, true)
        .attr("advertisedValue", AttrKind::Str, false)
    }

    pub fn attr(mut self, name: &str, kind: AttrKind, writable: bool) -> Self {
        self.attributes.push(AttributeSpec {
            name: name.to_string(),
            kind,
            writable,
        });
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Registry of known function classes
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    classes: HashMap<String, ClassSchema>,
}

impl SchemaRegistry {
    /// Registry pre-populated with the function classes shipped with Axon
    pub fn builtin() -> Self {
        let mut registry = Self::default();

        registry.register(
            ClassSchema::new("LightSensor")
                .attr("unit", AttrKind::Str, false)
                .attr("currentValue", AttrKind::Float, false),
        );
        registry.register(
            ClassSchema::new("RangeFinder")
                .attr("unit", AttrKind::Str, true)
                .attr("currentValue", AttrKind::Float, false)
                .attr("rangeFinderMode", AttrKind::Int, true)
                .attr("command", AttrKind::Str, true),
        );
        registry.register(
            ClassSchema::new("PowerMeter")
                .attr("unit", AttrKind::Str, false)
                .attr("currentValue", AttrKind::Float, false)
                .attr("cosPhi", AttrKind::Float, false)
                .attr("meter", AttrKind::Float, false),
        );

        registry
    }

    /// Add or replace a class schema
    pub fn register(&mut self, schema: ClassSchema) {
        self.classes.insert(schema.class_name.clone(), schema);
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassSchema> {
        self.classes.get(class_name)
    }

    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes() {
        let registry = SchemaRegistry::builtin();
        assert!(registry.get("LightSensor").is_some());
        assert!(registry.get("RangeFinder").is_some());
        assert!(registry.get("PowerMeter").is_some());
        assert!(registry.get("Relay").is_none());
    }

    #[test]
    fn test_common_attributes_present() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get("RangeFinder").unwrap();
        assert!(schema.attribute("logicalName").unwrap().writable);
        assert!(!schema.attribute("advertisedValue").unwrap().writable);
        assert_eq!(
            schema.attribute("rangeFinderMode").unwrap().kind,
            AttrKind::Int
        );
    }

    #[test]
    fn test_register_custom_class() {
        let mut registry = SchemaRegistry::builtin();
        registry.register(
            ClassSchema::new("Relay").attr("state", AttrKind::Bool, true),
        );
        let schema = registry.get("Relay").unwrap();
        assert!(schema.attribute("state").unwrap().writable);
        // Common attributes come with every schema
        assert!(schema.attribute("logicalName").is_some());
    }
}

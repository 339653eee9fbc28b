//! Attribute snapshots with monotonic-clock expiry

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::value::AttrValue;

/// Full attribute set of one function as last retrieved from its hub.
///
/// Expiry uses `Instant`, never wall-clock time, so system clock changes
/// cannot invalidate or resurrect entries.
#[derive(Debug, Clone)]
pub struct AttributeSnapshot {
    attributes: HashMap<String, AttrValue>,
    expires_at: Instant,
}

impl AttributeSnapshot {
    pub fn new(attributes: HashMap<String, AttrValue>, validity: Duration) -> Self {
        Self {
            attributes,
            expires_at: Instant::now() + validity,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// In-place update after a successful write-through, keeping the
    /// current expiry.
    pub fn set(&mut self, name: &str, value: AttrValue) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Force the next freshness check to fail
    pub fn expire(&mut self) {
        self.expires_at = Instant::now();
    }

    pub fn attributes(&self) -> &HashMap<String, AttrValue> {
        &self.attributes
    }
}

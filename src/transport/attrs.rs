//! Per-connection attribute map. Owned by the connection it's attached
//! to; every read returns an owned copy so callers never hold a
//! reference that outlives a concurrent write.

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct AttributeMap(DashMap<String, String>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|v| v.clone())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.0.remove(key).map(|(_, v)| v)
    }
}

//! The page's settable configuration object.
//!
//! It carries a data map (experiment flags live under container keys such as
//! `EXPERIMENT_FLAGS`) and a `set` entry point the page calls to merge new values in.

use std::sync::Arc;

use parking_lot::RwLock;
use playguard_core_types::CapabilitySlot;
use serde_json::{Map, Value};

use crate::error::HostError;

/// Arguments of one `set` call.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigWrite {
    /// `set({ KEY: value, ... })`
    Object(Map<String, Value>),
    /// `set("KEY", value)`
    Entry { key: String, value: Value },
}

pub type ConfigSetFn = Arc<dyn Fn(ConfigWrite) -> Value + Send + Sync>;

pub struct HostConfig {
    data: Arc<RwLock<Option<Map<String, Value>>>>,
    setter: CapabilitySlot<ConfigSetFn>,
}

impl HostConfig {
    /// Config object whose `set` merges writes into its own data map.
    pub fn new(data: Option<Map<String, Value>>) -> Self {
        let data = Arc::new(RwLock::new(data));
        let target = Arc::clone(&data);
        let setter: ConfigSetFn = Arc::new(move |write| {
            let mut guard = target.write();
            let map = guard.get_or_insert_with(Map::new);
            match write {
                ConfigWrite::Object(values) => {
                    for (key, value) in values {
                        map.insert(key, value);
                    }
                }
                ConfigWrite::Entry { key, value } => {
                    map.insert(key, value);
                }
            }
            Value::Null
        });
        Self {
            data,
            setter: CapabilitySlot::new(setter),
        }
    }

    /// Config object with a custom (or missing) setter.
    pub fn with_setter(data: Option<Map<String, Value>>, setter: Option<ConfigSetFn>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            setter: CapabilitySlot::from_option(setter),
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.read().is_some()
    }

    pub fn snapshot(&self) -> Option<Map<String, Value>> {
        self.data.read().clone()
    }

    pub fn with_data_mut<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> Option<R> {
        let mut guard = self.data.write();
        guard.as_mut().map(f)
    }

    pub fn setter(&self) -> &CapabilitySlot<ConfigSetFn> {
        &self.setter
    }

    /// Page-side call path for `set`.
    pub fn set(&self, write: ConfigWrite) -> Result<Value, HostError> {
        let setter = self
            .setter
            .get()
            .ok_or(HostError::EntryPointMissing("config.set"))?;
        Ok(setter(write))
    }
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("has_data", &self.has_data())
            .field("setter", &self.setter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_setter_merges_into_data() {
        let config = HostConfig::new(None);
        assert!(!config.has_data());
        config
            .set(ConfigWrite::Entry {
                key: "EXPERIMENT_FLAGS".into(),
                value: json!({ "a": true }),
            })
            .expect("set");
        let snapshot = config.snapshot().expect("data");
        assert_eq!(snapshot["EXPERIMENT_FLAGS"]["a"], json!(true));
    }

    #[test]
    fn missing_setter_is_reported() {
        let config = HostConfig::with_setter(Some(Map::new()), None);
        let err = config.set(ConfigWrite::Object(Map::new())).unwrap_err();
        assert!(err.is_missing());
    }
}

//! Typed key/value configuration wrapper (spec.md §4.6). The backend
//! itself (NVS on the real board) is out of scope per spec.md §1 — only
//! the key/value contract is fixed, expressed here as the [`ConfigBackend`]
//! trait.

use crate::error::TransientError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
}

/// The out-of-scope NVS collaborator's contract: plain get/set/erase over
/// byte-string-ish keys, plus a wildcard erase and a full dump.
pub trait ConfigBackend: Send {
    fn get(&self, key: &str) -> Option<ConfigValue>;
    fn set(&mut self, key: &str, value: ConfigValue);
    fn erase(&mut self, key: &str) -> bool;
    fn erase_wildcard(&mut self, prefix: &str) -> usize;
    fn dump(&self) -> Vec<(String, ConfigValue)>;
}

/// In-memory `ConfigBackend` for host tests and as a fallback store before
/// the firmware binary installs a real NVS-backed one.
#[derive(Default)]
pub struct MemoryConfigBackend {
    entries: std::collections::BTreeMap<String, ConfigValue>,
}

impl ConfigBackend for MemoryConfigBackend {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: ConfigValue) {
        self.entries.insert(key.to_string(), value);
    }

    fn erase(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn erase_wildcard(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            self.entries.remove(key);
        }
        matching.len()
    }

    fn dump(&self) -> Vec<(String, ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Thin facade over a [`ConfigBackend`] exposing the typed accessors
/// spec.md §4.6 names. A missing key is a [`TransientError`], matching the
/// "handler pattern: catch and substitute default" note.
pub struct ConfigStore {
    backend: Box<dyn ConfigBackend>,
}

impl ConfigStore {
    pub fn new(backend: Box<dyn ConfigBackend>) -> Self {
        Self { backend }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, TransientError> {
        match self.backend.get(key) {
            Some(ConfigValue::Int(v)) => Ok(v),
            Some(ConfigValue::Str(_)) => Err(TransientError::ConfigKeyNotFound),
            None => Err(TransientError::ConfigKeyNotFound),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String, TransientError> {
        match self.backend.get(key) {
            Some(ConfigValue::Str(v)) => Ok(v),
            Some(ConfigValue::Int(_)) => Err(TransientError::ConfigKeyNotFound),
            None => Err(TransientError::ConfigKeyNotFound),
        }
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.backend.set(key, ConfigValue::Int(value));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.backend.set(key, ConfigValue::Str(value.to_string()));
    }

    pub fn erase(&mut self, key: &str) -> bool {
        self.backend.erase(key)
    }

    pub fn erase_wildcard(&mut self, prefix: &str) -> usize {
        self.backend.erase_wildcard(prefix)
    }

    pub fn dump(&self) -> Vec<(String, ConfigValue)> {
        self.backend.dump()
    }
}

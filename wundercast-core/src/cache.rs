//! Last-known-good results for city searches.
//!
//! Lives as long as the pipeline that owns it. Entries are overwritten on
//! every successful lookup and never evicted.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::model::WeatherResult;

/// Shared handle; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, WeatherResult>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, result: WeatherResult) {
        let key = key.into();
        tracing::debug!(key = %key, "caching weather result");
        self.entries.write().insert(key, result);
    }

    pub fn get(&self, key: &str) -> Option<WeatherResult> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

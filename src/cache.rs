use crate::config::ReportConfig;
use crate::error::Result;
use crate::ingestion::load_workbook;
use crate::schema::SalesWorkbook;
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Memoizes workbook loads by content hash, so re-running a view over the same
/// upload does not re-parse it. Failed loads are never cached.
#[derive(Debug, Default)]
pub struct WorkbookCache {
    entries: HashMap<String, Arc<SalesWorkbook>>,
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl WorkbookCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(bytes: &[u8], config: &ReportConfig) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.update(config.fingerprint().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get_or_load(&mut self, bytes: &[u8], config: &ReportConfig) -> Result<Arc<SalesWorkbook>> {
        let key = Self::key(bytes, config);
        if let Some(hit) = self.entries.get(&key) {
            debug!("Workbook cache hit {}", &key[..12]);
            return Ok(Arc::clone(hit));
        }

        let workbook = Arc::new(load_workbook(bytes, config)?);
        debug!("Workbook cache miss {}, stored", &key[..12]);
        self.entries.insert(key, Arc::clone(&workbook));
        Ok(workbook)
    }

    pub fn contains(&self, bytes: &[u8], config: &ReportConfig) -> bool {
        self.entries.contains_key(&Self::key(bytes, config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[test]
    fn test_failed_loads_are_not_cached() {
        let mut cache = WorkbookCache::new();
        let config = ReportConfig::default();
        assert!(cache.get_or_load(b"not a workbook", &config).is_err());
        assert!(cache.is_empty());
        assert!(!cache.contains(b"not a workbook", &config));
    }
}

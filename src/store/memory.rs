use std::collections::{HashMap, HashSet};

use anyhow::Result;

use super::{BucketId, ImageRecord, RecordStore};

/// 纯内存的记录存储，用于测试和一次性任务
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: HashMap<String, BucketId>,
    members: HashMap<BucketId, Vec<ImageRecord>>,
    names: HashSet<String>,
    sources: HashMap<String, String>,
    next_bucket: BucketId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn find_bucket(&self, signature: &str) -> Result<Option<BucketId>> {
        Ok(self.buckets.get(signature).copied())
    }

    fn create_bucket(&mut self, signature: &str) -> Result<BucketId> {
        let id = self.next_bucket;
        self.next_bucket += 1;
        self.buckets.insert(signature.to_string(), id);
        self.members.insert(id, Vec::new());
        Ok(id)
    }

    fn list_records(&self, bucket: BucketId) -> Result<Vec<ImageRecord>> {
        Ok(self.members.get(&bucket).cloned().unwrap_or_default())
    }

    fn name_exists(&self, name: &str) -> Result<bool> {
        Ok(self.names.contains(name))
    }

    fn append_record(&mut self, record: ImageRecord) -> Result<()> {
        self.names.insert(record.name.clone());
        self.members.entry(record.bucket).or_default().push(record);
        Ok(())
    }

    fn add_source(&mut self, name: &str, link: &str) -> Result<()> {
        self.sources.insert(link.to_string(), name.to_string());
        Ok(())
    }

    fn source_exists(&self, link: &str) -> Result<bool> {
        Ok(self.sources.contains_key(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, bucket: BucketId) -> ImageRecord {
        ImageRecord {
            name: name.to_string(),
            format: "png".to_string(),
            feature: vec![0; 32],
            bucket,
        }
    }

    #[test]
    fn test_bucket_lifecycle() {
        let mut store = MemoryStore::new();
        assert_eq!(store.find_bucket("sig").unwrap(), None);

        let id = store.create_bucket("sig").unwrap();
        assert_eq!(store.find_bucket("sig").unwrap(), Some(id));
        assert!(store.list_records(id).unwrap().is_empty());

        let other = store.create_bucket("other").unwrap();
        assert_ne!(id, other);
    }

    #[test]
    fn test_append_and_list() {
        let mut store = MemoryStore::new();
        let id = store.create_bucket("sig").unwrap();
        store.append_record(record("a", id)).unwrap();
        store.append_record(record("b", id)).unwrap();

        let records = store.list_records(id).unwrap();
        assert_eq!(records.len(), 2);
        assert!(store.name_exists("a").unwrap());
        assert!(store.name_exists("b").unwrap());
        assert!(!store.name_exists("c").unwrap());
    }

    #[test]
    fn test_sources() {
        let mut store = MemoryStore::new();
        assert!(!store.source_exists("http://example.com/1.png").unwrap());
        store.add_source("a", "http://example.com/1.png").unwrap();
        assert!(store.source_exists("http://example.com/1.png").unwrap());
    }
}

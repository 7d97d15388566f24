use crate::error::Error;
use crate::kv_store::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryKvStore {
    entries: BTreeMap<String, String>,
}

impl InMemoryKvStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(super) fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub(super) fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub(super) fn remove_prefix(&mut self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }
}

#[async_trait::async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, Error> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<(), Error> {
        self.remove(key);
        Ok(())
    }

    async fn delete_prefix(&mut self, prefix: &str) -> Result<(), Error> {
        self.remove_prefix(prefix);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefix_scan_is_ordered_and_bounded() {
        let mut store = InMemoryKvStore::default();
        store.put("/acl/ip/pool/10.0.0.2", "b".into()).await.unwrap();
        store.put("/acl/ip/pool/10.0.0.1", "a".into()).await.unwrap();
        store.put("/acl/ip/cidr/10.0.0.0/30", "c".into()).await.unwrap();
        store.put("/acl/ip/poolx", "x".into()).await.unwrap();

        let keys: Vec<String> = store
            .get_prefix("/acl/ip/pool/")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["/acl/ip/pool/10.0.0.1", "/acl/ip/pool/10.0.0.2"]);
    }

    #[tokio::test]
    async fn delete_prefix_leaves_siblings() {
        let mut store = InMemoryKvStore::default();
        store.put("/forward/group/a/x.com", "1".into()).await.unwrap();
        store.put("/forward/group/a/y.com", "2".into()).await.unwrap();
        store.put("/forward/group/ab/z.com", "3".into()).await.unwrap();

        store.delete_prefix("/forward/group/a/").await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("/forward/group/ab/z.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let mut store = InMemoryKvStore::default();
        assert!(store.delete("/nope").await.is_ok());
        assert!(store.is_empty());
    }
}

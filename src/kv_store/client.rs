//! Deadline-bounded access to a [`DynKvStore`].

use crate::error::Error;
use crate::kv_store::DynKvStore;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Time budgets for store access. `read` bounds each point read or listing; `write` bounds a
/// whole mutating operation including its fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            read: Duration::from_secs(10),
            write: Duration::from_secs(20),
        }
    }
}

/// Handle used by every service to talk to the store. Cheap to clone; all clones share the same
/// underlying [`DynKvStore`].
///
/// Each call takes a deadline rather than a duration so a multi-key fan-out can share one
/// budget: once the deadline passes, every remaining call fails fast with
/// [`Error::StoreTimeout`].
#[derive(Clone)]
pub struct StoreClient {
    store: DynKvStore,
}

impl StoreClient {
    pub fn new(store: DynKvStore) -> Self {
        StoreClient { store }
    }

    /// A deadline `budget` from now.
    pub fn deadline(budget: Duration) -> Instant {
        Instant::now() + budget
    }

    pub async fn get(&self, key: &str, deadline: Instant) -> Result<Option<String>, Error> {
        bounded(deadline, "get", key, async {
            self.store.read().await.get(key).await
        })
        .await
    }

    pub async fn get_prefix(
        &self,
        prefix: &str,
        deadline: Instant,
    ) -> Result<Vec<(String, String)>, Error> {
        bounded(deadline, "prefix scan", prefix, async {
            self.store.read().await.get_prefix(prefix).await
        })
        .await
    }

    pub async fn put(&self, key: &str, value: String, deadline: Instant) -> Result<(), Error> {
        bounded(deadline, "put", key, async {
            self.store.write().await.put(key, value).await
        })
        .await
    }

    pub async fn delete(&self, key: &str, deadline: Instant) -> Result<(), Error> {
        bounded(deadline, "delete", key, async {
            self.store.write().await.delete(key).await
        })
        .await
    }

    pub async fn delete_prefix(&self, prefix: &str, deadline: Instant) -> Result<(), Error> {
        bounded(deadline, "prefix delete", prefix, async {
            self.store.write().await.delete_prefix(prefix).await
        })
        .await
    }
}

async fn bounded<T>(
    deadline: Instant,
    op: &str,
    key: &str,
    call: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    // An expired deadline must not start a call that could still land in the background.
    if Instant::now() >= deadline {
        return Err(Error::StoreTimeout(format!("{op} \"{key}\"")));
    }
    match tokio::time::timeout_at(deadline, call).await {
        Ok(res) => res,
        Err(_) => Err(Error::StoreTimeout(format!("{op} \"{key}\""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::{shared, InMemoryKvStore, KvStore};

    struct StalledStore;

    #[async_trait::async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn get_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>, Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }

        async fn put(&mut self, _key: &str, _value: String) -> Result<(), Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn delete(&mut self, _key: &str) -> Result<(), Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn delete_prefix(&mut self, _prefix: &str) -> Result<(), Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_times_out() {
        let client = StoreClient::new(shared(StalledStore));
        let deadline = StoreClient::deadline(Duration::from_secs(10));

        let err = client.get("/acl/ip/pool/10.0.0.1", deadline).await;
        assert!(matches!(err, Err(Error::StoreTimeout(msg)) if msg.contains("10.0.0.1")));

        let err = client.put("/k", "v".to_string(), deadline).await;
        assert!(matches!(err, Err(Error::StoreTimeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_skips_the_store() {
        let store = shared(InMemoryKvStore::default());
        let client = StoreClient::new(store.clone());
        let deadline = StoreClient::deadline(Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        let err = client.put("/a", "1".to_string(), deadline).await;
        assert!(matches!(err, Err(Error::StoreTimeout(_))));
        assert!(store.read().await.get("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn calls_pass_through_before_deadline() {
        let client = StoreClient::new(shared(InMemoryKvStore::default()));
        let deadline = StoreClient::deadline(Duration::from_secs(10));

        client.put("/a/1", "one".to_string(), deadline).await.unwrap();
        client.put("/a/2", "two".to_string(), deadline).await.unwrap();
        assert_eq!(
            client.get("/a/1", deadline).await.unwrap(),
            Some("one".to_string())
        );
        client.delete_prefix("/a/", deadline).await.unwrap();
        assert!(client.get_prefix("/a/", deadline).await.unwrap().is_empty());
    }
}

use crate::acl::model::{block_key, pool_key};
use crate::acl::AclService;
use crate::error::Error;
use crate::kv_store::StoreClient;

impl AclService {
    /// Remove the block for `cidr` and every host snapshot inside its range.
    ///
    /// Host snapshots are removed whichever block they were won by, so hosts also covered by a
    /// surviving block lose their policy until that block is submitted again. Individual host
    /// deletes that fail are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] or [`Error::RangeTooLarge`] before touching the store if
    /// `cidr` can't be expanded, and the store error if the block record itself can't be
    /// deleted.
    pub async fn delete_block(&self, cidr: &str) -> Result<(), Error> {
        let range = self.expand(cidr)?;
        let cidr = range.cidr();
        let deadline = StoreClient::deadline(self.timeouts.write);

        let mut failed = 0_usize;
        for host in &range.hosts {
            if let Err(err) = self
                .store
                .delete(&pool_key(&host.to_string()), deadline)
                .await
            {
                failed += 1;
                tracing::warn!("block {cidr}: failed to delete host {host}: {err}");
            }
        }

        if let Err(err) = self.store.delete(&block_key(&cidr), deadline).await {
            tracing::error!("failed to delete block {cidr}: {err}");
            return Err(err);
        }
        tracing::info!(
            "deleted block {cidr}: {} hosts cleared, {failed} failed",
            range.usable_count() - failed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::acl::model::{block_key, pool_key, PolicyBlock};
    use crate::acl::{AclService, DEFAULT_MAX_BLOCK_HOSTS};
    use crate::error::Error;
    use crate::kv_store::{shared, DynKvStore, InMemoryKvStore, KvStore, StoreClient, Timeouts};
    use std::time::Duration;

    fn service(store: DynKvStore) -> AclService {
        AclService::new(
            StoreClient::new(store),
            Timeouts::default(),
            DEFAULT_MAX_BLOCK_HOSTS,
        )
    }

    fn block(cidr: &str, netmask: i64) -> PolicyBlock {
        PolicyBlock {
            cidr: cidr.to_string(),
            netmask,
            ..PolicyBlock::default()
        }
    }

    #[tokio::test]
    async fn removes_block_and_its_hosts_only() {
        let store = shared(InMemoryKvStore::default());
        let acl = service(store.clone());
        acl.submit_block(block("10.0.0.0/30", 30)).await.unwrap();
        acl.submit_block(block("10.0.1.0/30", 30)).await.unwrap();

        acl.delete_block("10.0.0.0/30").await.unwrap();

        let r = store.read().await;
        assert!(r.get(&block_key("10.0.0.0/30")).await.unwrap().is_none());
        assert!(r.get(&pool_key("10.0.0.1")).await.unwrap().is_none());
        assert!(r.get(&pool_key("10.0.0.2")).await.unwrap().is_none());
        assert!(r.get(&block_key("10.0.1.0/30")).await.unwrap().is_some());
        assert!(r.get(&pool_key("10.0.1.1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn non_canonical_cidr_deletes_canonical_key() {
        let store = shared(InMemoryKvStore::default());
        let acl = service(store.clone());
        acl.submit_block(block("10.0.0.0/30", 30)).await.unwrap();

        acl.delete_block("10.0.0.3/30").await.unwrap();
        let left = store.read().await.get_prefix("/").await.unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn invalid_cidr_is_rejected() {
        let acl = service(shared(InMemoryKvStore::default()));
        assert!(matches!(
            acl.delete_block("10.0.0.0").await,
            Err(Error::InvalidRange(_, _))
        ));
    }

    /// Deletes of host keys succeed, the block key delete never returns.
    struct StuckBlockDelete(InMemoryKvStore);

    #[async_trait::async_trait]
    impl KvStore for StuckBlockDelete {
        async fn get(&self, key: &str) -> Result<Option<String>, Error> {
            self.0.get(key).await
        }

        async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, Error> {
            self.0.get_prefix(prefix).await
        }

        async fn put(&mut self, key: &str, value: String) -> Result<(), Error> {
            self.0.put(key, value).await
        }

        async fn delete(&mut self, key: &str) -> Result<(), Error> {
            if key.starts_with("/acl/ip/cidr/") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.0.delete(key).await
        }

        async fn delete_prefix(&mut self, prefix: &str) -> Result<(), Error> {
            self.0.delete_prefix(prefix).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn block_delete_timeout_is_reported() {
        let store = shared(StuckBlockDelete(InMemoryKvStore::default()));
        let acl = service(store.clone());
        acl.submit_block(block("10.0.0.0/30", 30)).await.unwrap();

        let res = acl.delete_block("10.0.0.0/30").await;
        assert!(matches!(res, Err(Error::StoreTimeout(_))));

        let r = store.read().await;
        assert!(r.get(&pool_key("10.0.0.1")).await.unwrap().is_none());
        assert!(r.get(&block_key("10.0.0.0/30")).await.unwrap().is_some());
    }
}

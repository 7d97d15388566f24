use crate::acl::model::{block_key, pool_key, HostSnapshot, PolicyBlock};
use crate::acl::AclService;
use crate::error::Error;
use crate::kv_store::{decode, StoreClient};
use std::net::IpAddr;
use tokio::time::Instant;

enum Merge {
    Written,
    Outranked,
}

impl AclService {
    /// Store `block` and materialize it over every usable host in its range.
    ///
    /// The block record always replaces any previous definition for the same CIDR. Each host
    /// then receives a copy of the block's policy unless its current snapshot
    /// [outranks][HostSnapshot::outranks] the block. Hosts whose snapshot can't be read or
    /// written are logged and skipped; they don't fail the submission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] or [`Error::RangeTooLarge`] before touching the store if
    /// `block.cidr` can't be expanded, and the store error (e.g. [`Error::StoreTimeout`]) if the
    /// block record itself can't be written.
    pub async fn submit_block(&self, mut block: PolicyBlock) -> Result<(), Error> {
        let range = self.expand(&block.cidr)?;
        block.cidr = range.cidr();
        block.ip = block.cidr.clone();

        let deadline = StoreClient::deadline(self.timeouts.write);
        let value = serde_json::to_string(&block)?;
        if let Err(err) = self.store.put(&block_key(&block.cidr), value, deadline).await {
            tracing::error!("failed to store block {}: {err}", block.cidr);
            return Err(err);
        }

        let (mut written, mut outranked, mut failed) = (0_usize, 0_usize, 0_usize);
        for host in &range.hosts {
            match self.merge_host(&block, *host, deadline).await {
                Ok(Merge::Written) => written += 1,
                Ok(Merge::Outranked) => outranked += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!("block {}: skipped host {host}: {err}", block.cidr);
                }
            }
        }

        tracing::info!(
            "materialized block {} (netmask {}): {written} written, {outranked} kept, {failed} failed",
            block.cidr,
            block.netmask
        );
        Ok(())
    }

    async fn merge_host(
        &self,
        block: &PolicyBlock,
        host: IpAddr,
        deadline: Instant,
    ) -> Result<Merge, Error> {
        let key = pool_key(&host.to_string());
        if let Some(raw) = self.store.get(&key, deadline).await? {
            let existing: HostSnapshot = decode(&key, &raw)?;
            if existing.outranks(block) {
                tracing::debug!(
                    "host {host}: kept {} (netmask {}) over {} (netmask {})",
                    existing.cidr,
                    existing.netmask,
                    block.cidr,
                    block.netmask
                );
                return Ok(Merge::Outranked);
            }
        }

        let snapshot = HostSnapshot::from_block(block, host);
        self.store
            .put(&key, serde_json::to_string(&snapshot)?, deadline)
            .await?;
        Ok(Merge::Written)
    }
}

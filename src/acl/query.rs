use crate::acl::model::{pool_key, HostSnapshot, PolicyBlock, BLOCK_PREFIX, POOL_PREFIX};
use crate::acl::AclService;
use crate::error::Error;
use crate::kv_store::{decode, StoreClient};
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::str::FromStr;

impl AclService {
    /// Every stored block. Malformed records are skipped. When no block exists a single
    /// [placeholder][PolicyBlock::placeholder] is returned so listings always have a row to
    /// start editing from.
    ///
    /// # Errors
    ///
    /// Returns the store error if the scan itself fails.
    pub async fn list_blocks(&self) -> Result<Vec<PolicyBlock>, Error> {
        let mut blocks: Vec<PolicyBlock> = self.scan(BLOCK_PREFIX).await?;
        if blocks.is_empty() {
            blocks.push(PolicyBlock::placeholder());
        }
        Ok(blocks)
    }

    /// The snapshots of every host in `cidr` that has one, in ascending address order. The
    /// snapshots may have been won by any block covering the host, not only `cidr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] or [`Error::RangeTooLarge`] if `cidr` can't be expanded.
    pub async fn list_host_snapshots_in_block(
        &self,
        cidr: &str,
    ) -> Result<Vec<HostSnapshot>, Error> {
        let range = self.expand(cidr)?;
        let deadline = StoreClient::deadline(self.timeouts.read);

        let mut snapshots = Vec::new();
        for host in &range.hosts {
            let key = pool_key(&host.to_string());
            let found = match self.store.get(&key, deadline).await {
                Ok(Some(raw)) => decode::<HostSnapshot>(&key, &raw).map(Some),
                Ok(None) => Ok(None),
                Err(err) => Err(err),
            };
            match found {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(err) => tracing::warn!("skipping host {host}: {err}"),
            }
        }
        Ok(snapshots)
    }

    /// Every materialized host snapshot, in key order. Malformed records are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store error if the scan itself fails.
    pub async fn list_all_host_snapshots(&self) -> Result<Vec<HostSnapshot>, Error> {
        self.scan(POOL_PREFIX).await
    }

    /// The policy currently materialized for a single address. A malformed snapshot is logged
    /// and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `ip` isn't an IP address, or the store error.
    pub async fn host_policy(&self, ip: &str) -> Result<Option<HostSnapshot>, Error> {
        let ip = IpAddr::from_str(ip.trim()).map_err(|_| Error::InvalidAddress(ip.to_string()))?;
        let key = pool_key(&ip.to_string());
        let deadline = StoreClient::deadline(self.timeouts.read);
        let Some(raw) = self.store.get(&key, deadline).await? else {
            return Ok(None);
        };
        match decode(&key, &raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                tracing::warn!("{err}");
                Ok(None)
            }
        }
    }

    async fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, Error> {
        let deadline = StoreClient::deadline(self.timeouts.read);
        let entries = self.store.get_prefix(prefix, deadline).await?;
        Ok(entries
            .iter()
            .filter_map(|(key, raw)| match decode(key, raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!("{err}");
                    None
                }
            })
            .collect())
    }
}

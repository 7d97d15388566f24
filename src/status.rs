//! Read-only views of resolver registrations.
//!
//! Resolver instances register themselves at `/smartdns/app/<name>`, and the per-line upstream
//! servers they use at `/line/dns/<zone>/<line>/<addr>`. Only the keys carry information; the
//! stored values are ignored.

use crate::error::Error;
use crate::kv_store::{StoreClient, Timeouts};
use serde::Serialize;

pub const RESOLVERS_PREFIX: &str = "/smartdns/app/";
pub const LINE_DNS_PREFIX: &str = "/line/dns/";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolverInstance {
    pub name: String,
    pub status: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineDns {
    pub zone_name: String,
    pub line_type: String,
    pub addr: String,
}

#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct StatusService {
    store: StoreClient,
    timeouts: Timeouts,
}

impl StatusService {
    pub fn new(store: StoreClient, timeouts: Timeouts) -> Self {
        StatusService { store, timeouts }
    }

    /// Every registered resolver instance. Registration means the instance is online.
    ///
    /// # Errors
    ///
    /// Returns the store error if the scan fails.
    pub async fn resolver_instances(&self) -> Result<Vec<ResolverInstance>, Error> {
        Ok(self
            .keys(RESOLVERS_PREFIX)
            .await?
            .iter()
            .filter_map(|key| key.split('/').nth(3))
            .map(|name| ResolverInstance {
                name: name.to_string(),
                status: "online".to_string(),
            })
            .collect())
    }

    /// Every registered line DNS server. Keys without zone, line and address are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store error if the scan fails.
    pub async fn line_dns(&self) -> Result<Vec<LineDns>, Error> {
        Ok(self
            .keys(LINE_DNS_PREFIX)
            .await?
            .iter()
            .filter_map(|key| {
                let segments: Vec<&str> = key.split('/').collect();
                match segments.as_slice() {
                    [_, _, _, zone, line, addr, ..] => Some(LineDns {
                        zone_name: (*zone).to_string(),
                        line_type: (*line).to_string(),
                        addr: (*addr).to_string(),
                    }),
                    _ => {
                        tracing::debug!("ignoring line DNS key {key}");
                        None
                    }
                }
            })
            .collect())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let deadline = StoreClient::deadline(self.timeouts.read);
        Ok(self
            .store
            .get_prefix(prefix, deadline)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}

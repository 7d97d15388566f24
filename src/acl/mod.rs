//! ACL policy materialization.
//!
//! Users submit policies scoped to CIDR blocks ([`PolicyBlock`]). The store can't answer
//! "which blocks cover this address", so every block is flattened into one
//! [`HostSnapshot`] per usable host address at submission time. A lookup for a single address
//! is then a single point read.
//!
//! # Precedence
//!
//! Blocks overlap. When a block is materialized over a host that already has a snapshot, the
//! existing snapshot is kept only if its recorded `netmask` is strictly greater than the
//! incoming block's `netmask`. Otherwise the incoming block's policy replaces it.
//!
//! Snapshots are copies, not a live join over all covering blocks. Deleting a block removes
//! every snapshot inside its range, including those that were won by a different, more
//! specific block; such hosts are left without a snapshot until a covering block is submitted
//! again.
//!
//! # Consistency
//!
//! There are no multi-key transactions. The block record is written (or deleted) as the
//! authoritative step and its failure fails the operation. The per-host fan-out is best-effort:
//! each host is handled independently, failures are logged and the remaining hosts are still
//! processed. Both fan-outs are idempotent, so repeating an operation converges.

use crate::acl::range::HostRange;
use crate::error::Error;
use crate::kv_store::{StoreClient, Timeouts};

mod deletion;
mod materializer;
pub mod model;
mod query;
pub mod range;

pub use model::{AclPolicy, HostSnapshot, PolicyBlock};

/// Default for [`AclService::max_block_hosts`]: the size of an IPv4 `/16`.
pub const DEFAULT_MAX_BLOCK_HOSTS: u128 = 1 << 16;

#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct AclService {
    store: StoreClient,
    timeouts: Timeouts,
    max_block_hosts: u128,
}

impl AclService {
    pub fn new(store: StoreClient, timeouts: Timeouts, max_block_hosts: u128) -> Self {
        AclService {
            store,
            timeouts,
            max_block_hosts: max_block_hosts.min(range::MAX_EXPANSION),
        }
    }

    /// Largest block, in candidate addresses, this service will expand.
    pub fn max_block_hosts(&self) -> u128 {
        self.max_block_hosts
    }

    fn expand(&self, cidr: &str) -> Result<HostRange, Error> {
        let network = range::parse_cidr(cidr)?;
        range::check_size(cidr, &network, self.max_block_hosts)?;
        Ok(HostRange {
            network,
            hosts: range::hosts(&network),
        })
    }
}

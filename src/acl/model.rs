//! Stored ACL records and their key layout.
//!
//! Block-level records and per-host snapshots share one JSON shape, so a listing of either can
//! be rendered with the same columns:
//!
//! ```json
//! {
//!   "ip": "10.0.0.1",
//!   "cidr": "10.0.0.0/24",
//!   "netmask": 24,
//!   "masterLineDnsReStr": "telecom",
//!   "masterDns": ["10.1.1.1"],
//!   "backupLineDnsReStr": "unicom",
//!   "backupDns": ["10.2.2.2"],
//!   "forwardGroup": ["office"],
//!   "timeout": 5
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Prefix under which every [`PolicyBlock`] is stored, keyed by its CIDR.
pub const BLOCK_PREFIX: &str = "/acl/ip/cidr/";

/// Prefix under which every [`HostSnapshot`] is stored, keyed by its address.
pub const POOL_PREFIX: &str = "/acl/ip/pool/";

pub fn block_key(cidr: &str) -> String {
    format!("{BLOCK_PREFIX}{cidr}")
}

pub fn pool_key(ip: &str) -> String {
    format!("{POOL_PREFIX}{ip}")
}

/// Resolution policy applied to clients of a block.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AclPolicy {
    #[serde(rename = "masterLineDnsReStr")]
    pub master_line: String,
    #[serde(rename = "masterDns")]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub master_dns: Vec<String>,
    #[serde(rename = "backupLineDnsReStr")]
    pub backup_line: String,
    #[serde(rename = "backupDns")]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub backup_dns: Vec<String>,
    #[serde(rename = "forwardGroup")]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub forward_groups: BTreeSet<String>,
    /// Upstream query timeout, in seconds.
    pub timeout: i64,
}

/// A policy scoped to a CIDR block, as submitted by a user.
///
/// `netmask` is the caller's specificity indicator. It is compared as-is against the value
/// recorded on existing host snapshots and is never derived from `cidr`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyBlock {
    /// Display address. Always equal to `cidr` once stored.
    pub ip: String,
    pub cidr: String,
    pub netmask: i64,
    #[serde(flatten)]
    pub policy: AclPolicy,
}

impl PolicyBlock {
    /// The row returned by [`list_blocks`][crate::acl::AclService::list_blocks] when no block
    /// exists yet.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.cidr.is_empty()
    }
}

/// The policy materialized for one address, copied from whichever block last won precedence
/// for it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HostSnapshot {
    pub ip: String,
    /// CIDR of the block the policy was copied from.
    pub cidr: String,
    /// `netmask` of the block the policy was copied from.
    pub netmask: i64,
    #[serde(flatten)]
    pub policy: AclPolicy,
}

impl HostSnapshot {
    pub fn from_block(block: &PolicyBlock, host: IpAddr) -> Self {
        HostSnapshot {
            ip: host.to_string(),
            cidr: block.cidr.clone(),
            netmask: block.netmask,
            policy: block.policy.clone(),
        }
    }

    /// Whether this snapshot survives a merge of `candidate`. Only a strictly greater recorded
    /// `netmask` wins; ties go to the candidate.
    pub fn outranks(&self, candidate: &PolicyBlock) -> bool {
        self.netmask > candidate.netmask
    }
}

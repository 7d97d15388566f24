//! aclpool
//!
//! Manages client ACL and DNS forwarding policy for a fleet of line-aware resolvers, stored as
//! records in a hierarchical key-value store that the resolvers read directly.
//!
//! The interesting part is [`acl`]: policies are submitted per CIDR block but resolvers look
//! them up per client address, so each block is materialized into one record per host, with
//! overlapping blocks resolved by a `netmask` precedence rule. See the [`acl`] module docs.
//!
//! Everything is exposed through a small JSON [HTTP API][api].
//!
#![warn(clippy::pedantic)]

pub mod acl;
pub mod api;
pub mod config;
pub mod error;
pub mod forward;
pub mod kv_store;
pub mod status;

pub use acl::AclService;
pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use forward::ForwardService;
pub use kv_store::{FileKvStore, InMemoryKvStore};
pub use status::StatusService;

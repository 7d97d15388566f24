//! Error types.

use axum::extract::rejection::JsonRejection;
use ipnetwork::IpNetworkError;
use std::net::IpAddr;

/// Error enumerates the possible aclpool error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a CIDR block can't be parsed. Always raised before the store is touched.
    #[error("invalid CIDR block \"{0}\": {1}")]
    InvalidRange(String, #[source] IpNetworkError),

    /// Returned when a CIDR block holds more candidate addresses than the expansion limit
    /// allows, e.g. an IPv6 `/64`.
    #[error("CIDR block \"{cidr}\" has {candidates} addresses, limit is {limit}")]
    RangeTooLarge {
        cidr: String,
        candidates: u128,
        limit: u128,
    },

    /// Returned when a host lookup is given something that isn't a single IP address.
    #[error("invalid IP address \"{0}\"")]
    InvalidAddress(String),

    /// Returned when a forward group name is empty or would break the key layout.
    #[error("invalid forward group name \"{0}\"")]
    InvalidGroupName(String),

    /// Returned when a forward rule names a domain that isn't a valid DNS name.
    #[error("invalid domain \"{0}\"")]
    InvalidDomain(String),

    /// Returned by the [HTTP API][crate::api] when a single-entry lookup finds nothing.
    #[error("nothing stored for \"{0}\"")]
    NotFound(String),

    /// Returned when a single store call doesn't complete before its deadline.
    #[error("store timed out during {0}")]
    StoreTimeout(String),

    /// Returned when a stored value does not have the expected JSON shape. Listings log and
    /// skip these rather than failing.
    #[error("malformed value at key \"{key}\"")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space. The
    /// [HTTP API][crate::api] performs no authentication of its own and is only meant to be
    /// reachable from a management network.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [loading a `Config`][crate::config::Config::try_from_file], or
    /// [loading a `FileKvStore`][crate::kv_store::file::FileKvStore::try_from_file]) fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

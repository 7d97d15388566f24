use crate::acl::DEFAULT_MAX_BLOCK_HOSTS;
use crate::error::Error;
use crate::kv_store::{self, DynKvStore, FileKvStore, InMemoryKvStore, Timeouts};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

/// Service configuration, loaded from a JSON file:
///
/// ```json
/// {
///   "api_bind_addr": "127.0.0.1:8080",
///   "api_timeout": 30,
///   "store_state_path": "/var/lib/aclpool/state.json",
///   "read_timeout": 10,
///   "write_timeout": 20,
///   "max_block_hosts": 65536
/// }
/// ```
///
/// Only `api_bind_addr` is required. Timeouts are in seconds.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    /// When unset the store lives in memory only and is lost on restart.
    #[serde(default)]
    pub store_state_path: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_write_timeout")]
    pub write_timeout: Duration,
    #[serde(default = "default_max_block_hosts")]
    pub max_block_hosts: u128,
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_read_timeout() -> Duration {
    Timeouts::default().read
}

fn default_write_timeout() -> Duration {
    Timeouts::default().write
}

fn default_max_block_hosts() -> u128 {
    DEFAULT_MAX_BLOCK_HOSTS
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            read: self.read_timeout,
            write: self.write_timeout,
        }
    }

    /// Open the configured store: file-backed if `store_state_path` is set, in-memory otherwise.
    pub async fn kv_store(&self) -> Result<DynKvStore, Error> {
        match &self.store_state_path {
            Some(path) => {
                tracing::info!("using file store at {path}");
                Ok(kv_store::shared(FileKvStore::try_from_file(path).await?))
            }
            None => {
                tracing::warn!("no store_state_path configured, state will not survive restarts");
                Ok(kv_store::shared(InMemoryKvStore::default()))
            }
        }
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

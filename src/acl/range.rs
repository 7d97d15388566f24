//! CIDR block expansion.
//!
//! Turns a block like `10.0.0.0/30` into the ordered list of usable host addresses it contains.
//! The network and broadcast addresses are dropped, except for blocks with two or fewer
//! candidate addresses (`/31`, `/32`, `/127`, `/128`) which are returned whole.

use crate::error::Error;
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Upper bound on the candidate addresses [`expand`] will enumerate: the size of an IPv4 `/8`.
pub const MAX_EXPANSION: u128 = 1 << 24;

/// A parsed CIDR block and its usable host addresses, in ascending numeric order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRange {
    pub network: IpNetwork,
    pub hosts: Vec<IpAddr>,
}

impl HostRange {
    pub fn usable_count(&self) -> usize {
        self.hosts.len()
    }

    /// The block in canonical form, see [`canonical`].
    pub fn cidr(&self) -> String {
        canonical(&self.network)
    }
}

/// Parse `cidr` and enumerate its usable hosts.
///
/// # Errors
///
/// Returns [`Error::InvalidRange`] if `cidr` isn't in `address/prefix` form, and
/// [`Error::RangeTooLarge`] if the block has more than [`MAX_EXPANSION`] addresses.
pub fn expand(cidr: &str) -> Result<HostRange, Error> {
    let network = parse_cidr(cidr)?;
    check_size(cidr, &network, MAX_EXPANSION)?;
    Ok(HostRange {
        network,
        hosts: hosts(&network),
    })
}

/// Parse a CIDR block. Host bits are allowed and masked off later; a bare address without a
/// prefix length is rejected.
pub fn parse_cidr(cidr: &str) -> Result<IpNetwork, Error> {
    let cidr = cidr.trim();
    if !cidr.contains('/') {
        return Err(Error::InvalidRange(
            cidr.to_string(),
            ipnetwork::IpNetworkError::InvalidCidrFormat("missing prefix length".to_string()),
        ));
    }
    IpNetwork::from_str(cidr).map_err(|err| Error::InvalidRange(cidr.to_string(), err))
}

/// The block as `network/prefix` with host bits cleared. Used to derive store keys so that
/// `10.0.0.5/24` and `10.0.0.0/24` name the same block.
pub fn canonical(network: &IpNetwork) -> String {
    format!("{}/{}", network.network(), network.prefix())
}

/// Number of addresses in the block, before network/broadcast trimming. Saturates for
/// IPv6 `/0`.
pub fn candidate_count(network: &IpNetwork) -> u128 {
    let bits = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    1u128
        .checked_shl(u32::from(bits - network.prefix()))
        .unwrap_or(u128::MAX)
}

/// Reject `network` if it has more than `limit` candidate addresses.
pub fn check_size(cidr: &str, network: &IpNetwork, limit: u128) -> Result<(), Error> {
    let candidates = candidate_count(network);
    if candidates > limit {
        return Err(Error::RangeTooLarge {
            cidr: cidr.to_string(),
            candidates,
            limit,
        });
    }
    Ok(())
}

/// Usable hosts of an already size-checked block.
pub fn hosts(network: &IpNetwork) -> Vec<IpAddr> {
    let count = candidate_count(network);
    // Blocks of two or fewer addresses have no network/broadcast pair to drop.
    let (skip, take) = if count <= 2 {
        (0, count)
    } else {
        (1, count - 2)
    };

    match network {
        IpNetwork::V4(net) => {
            let first = u32::from(net.network());
            (0..take)
                .map(|i| {
                    // skip + i < count <= 2^32
                    #[allow(clippy::cast_possible_truncation)]
                    let offset = (skip + i) as u32;
                    IpAddr::V4(Ipv4Addr::from(first.wrapping_add(offset)))
                })
                .collect()
        }
        IpNetwork::V6(net) => {
            let first = u128::from(net.network());
            (0..take)
                .map(|i| IpAddr::V6(Ipv6Addr::from(first.wrapping_add(skip + i))))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(range: &HostRange) -> Vec<String> {
        range.hosts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn slash_30_drops_network_and_broadcast() {
        let range = expand("10.0.0.0/30").unwrap();
        assert_eq!(strings(&range), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(range.usable_count(), 2);
    }

    #[test]
    fn slash_31_is_not_trimmed() {
        let range = expand("10.0.0.0/31").unwrap();
        assert_eq!(strings(&range), vec!["10.0.0.0", "10.0.0.1"]);
        assert_eq!(range.usable_count(), 2);
    }

    #[test]
    fn slash_32_is_the_address() {
        let range = expand("192.168.1.7/32").unwrap();
        assert_eq!(strings(&range), vec!["192.168.1.7"]);
    }

    #[test]
    fn host_bits_are_masked() {
        let range = expand("10.1.2.77/29").unwrap();
        assert_eq!(range.cidr(), "10.1.2.72/29");
        assert_eq!(range.hosts.first().unwrap().to_string(), "10.1.2.73");
        assert_eq!(range.hosts.last().unwrap().to_string(), "10.1.2.78");
    }

    #[test]
    fn slash_24_hosts_are_ordered_distinct_and_inside() {
        let range = expand("172.16.5.0/24").unwrap();
        assert_eq!(range.usable_count(), 254);
        assert!(range.hosts.windows(2).all(|w| w[0] < w[1]));
        assert!(range.hosts.iter().all(|ip| range.network.contains(*ip)));
        assert!(!range.hosts.contains(&"172.16.5.0".parse::<IpAddr>().unwrap()));
        assert!(!range.hosts.contains(&"172.16.5.255".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn crosses_octet_boundary() {
        let range = expand("10.0.0.0/23").unwrap();
        assert_eq!(range.usable_count(), 510);
        assert!(range
            .hosts
            .contains(&"10.0.0.255".parse::<IpAddr>().unwrap()));
        assert!(range.hosts.contains(&"10.0.1.0".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn ipv6_block() {
        let range = expand("fd00::/126").unwrap();
        assert_eq!(strings(&range), vec!["fd00::1", "fd00::2"]);
        let range = expand("fd00::/127").unwrap();
        assert_eq!(strings(&range), vec!["fd00::", "fd00::1"]);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "10.0.0.0", "10.0.0.0/33", "10.0.0.0/x", "banana/8", "fd00::/129"] {
            assert!(
                matches!(expand(bad), Err(Error::InvalidRange(_, _))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_huge_blocks() {
        assert!(matches!(
            expand("fd00::/64"),
            Err(Error::RangeTooLarge { .. })
        ));
        assert!(matches!(expand("0.0.0.0/0"), Err(Error::RangeTooLarge { .. })));
        let slash_8 = parse_cidr("10.0.0.0/8").unwrap();
        assert!(check_size("10.0.0.0/8", &slash_8, MAX_EXPANSION).is_ok());
    }

    #[test]
    fn candidate_count_saturates() {
        let net = parse_cidr("::/0").unwrap();
        assert_eq!(candidate_count(&net), u128::MAX);
    }
}

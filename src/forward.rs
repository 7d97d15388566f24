//! Forwarding groups.
//!
//! A forwarding group is a named set of per-domain rules telling the resolver which upstream
//! servers to forward a domain's queries to. Groups are referenced by name from
//! [`AclPolicy::forward_groups`][crate::acl::AclPolicy::forward_groups].
//!
//! Layout:
//!
//! - `/forward/groups/<group>` holds the literal `ok` and marks the group as existing.
//! - `/forward/group/<group>/<domain>` holds the JSON [`ForwardRule`] for one domain.

use crate::error::Error;
use crate::kv_store::{decode, StoreClient, Timeouts};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use std::str::FromStr;
use trust_dns_proto::rr::Name;

pub const GROUPS_PREFIX: &str = "/forward/groups/";
pub const RULES_PREFIX: &str = "/forward/group/";

const GROUP_MARKER: &str = "ok";

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ForwardRule {
    #[serde(rename = "groupName")]
    pub group: String,
    pub domain: String,
    #[serde(rename = "lineDnsReStr")]
    pub line: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub dns: Vec<String>,
}

impl ForwardRule {
    /// The row returned by [`ForwardService::list_groups`] when no group exists yet. It carries
    /// one empty resolver entry so editors render an input for it.
    pub fn placeholder() -> Self {
        ForwardRule {
            dns: vec![String::new()],
            ..ForwardRule::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.group.is_empty()
    }
}

fn group_key(group: &str) -> String {
    format!("{GROUPS_PREFIX}{group}")
}

fn rules_prefix(group: &str) -> String {
    format!("{RULES_PREFIX}{group}/")
}

fn rule_key(group: &str, domain: &str) -> String {
    format!("{RULES_PREFIX}{group}/{domain}")
}

fn valid_group(group: &str) -> Result<&str, Error> {
    let group = group.trim();
    if group.is_empty() || group.contains('/') {
        return Err(Error::InvalidGroupName(group.to_string()));
    }
    Ok(group)
}

/// Lowercased, without a trailing dot.
fn normalized_domain(domain: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidDomain(domain.to_string());
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let name = Name::from_str(trimmed).map_err(|_| invalid())?;
    let mut name = name.to_lowercase();
    name.set_fqdn(false);
    Ok(name.to_string())
}

#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct ForwardService {
    store: StoreClient,
    timeouts: Timeouts,
}

impl ForwardService {
    pub fn new(store: StoreClient, timeouts: Timeouts) -> Self {
        ForwardService { store, timeouts }
    }

    /// One row per existing group, with only the group name set, or a single
    /// [placeholder][ForwardRule::placeholder] when there are none.
    ///
    /// # Errors
    ///
    /// Returns the store error if the scan fails.
    pub async fn list_groups(&self) -> Result<Vec<ForwardRule>, Error> {
        let deadline = StoreClient::deadline(self.timeouts.read);
        let mut groups: Vec<ForwardRule> = self
            .store
            .get_prefix(GROUPS_PREFIX, deadline)
            .await?
            .into_iter()
            .filter_map(|(key, _)| {
                key.strip_prefix(GROUPS_PREFIX).map(|name| ForwardRule {
                    group: name.to_string(),
                    ..ForwardRule::default()
                })
            })
            .collect();
        if groups.is_empty() {
            groups.push(ForwardRule::placeholder());
        }
        Ok(groups)
    }

    /// Store `rule`, creating its group first if needed. Returns the rule as stored, with its
    /// domain normalized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] or [`Error::InvalidDomain`] before touching the
    /// store, or the store error if the marker or the rule can't be written.
    pub async fn put_rule(&self, mut rule: ForwardRule) -> Result<ForwardRule, Error> {
        rule.group = valid_group(&rule.group)?.to_string();
        rule.domain = normalized_domain(&rule.domain)?;
        let deadline = StoreClient::deadline(self.timeouts.write);

        let marker = group_key(&rule.group);
        if self.store.get(&marker, deadline).await?.is_none() {
            self.store
                .put(&marker, GROUP_MARKER.to_string(), deadline)
                .await?;
            tracing::info!("created forward group {}", rule.group);
        }

        let value = serde_json::to_string(&rule)?;
        self.store
            .put(&rule_key(&rule.group, &rule.domain), value, deadline)
            .await?;
        tracing::info!("stored forward rule {} in {}", rule.domain, rule.group);
        Ok(rule)
    }

    /// Every rule in `group`, in key order. Malformed rules are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`], or the store error if the scan fails.
    pub async fn list_rules(&self, group: &str) -> Result<Vec<ForwardRule>, Error> {
        let group = valid_group(group)?;
        let deadline = StoreClient::deadline(self.timeouts.read);
        let entries = self.store.get_prefix(&rules_prefix(group), deadline).await?;
        Ok(entries
            .iter()
            .filter_map(|(key, raw)| match decode(key, raw) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    tracing::warn!("{err}");
                    None
                }
            })
            .collect())
    }

    /// The rule for `domain` in `group`. A malformed rule is logged and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] or [`Error::InvalidDomain`] for bad input, or the
    /// store error.
    pub async fn get_rule(&self, group: &str, domain: &str) -> Result<Option<ForwardRule>, Error> {
        let key = rule_key(valid_group(group)?, &normalized_domain(domain)?);
        let deadline = StoreClient::deadline(self.timeouts.read);
        let Some(raw) = self.store.get(&key, deadline).await? else {
            return Ok(None);
        };
        match decode(&key, &raw) {
            Ok(rule) => Ok(Some(rule)),
            Err(err) => {
                tracing::warn!("{err}");
                Ok(None)
            }
        }
    }

    /// Remove every rule of `group`, then the group itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`], or the store error of the first delete that fails.
    pub async fn delete_group(&self, group: &str) -> Result<(), Error> {
        let group = valid_group(group)?;
        let deadline = StoreClient::deadline(self.timeouts.write);
        self.store
            .delete_prefix(&rules_prefix(group), deadline)
            .await?;
        self.store.delete(&group_key(group), deadline).await?;
        tracing::info!("deleted forward group {group}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] or [`Error::InvalidDomain`], or the store error.
    pub async fn delete_rule(&self, group: &str, domain: &str) -> Result<(), Error> {
        let group = valid_group(group)?;
        let domain = normalized_domain(domain)?;
        let deadline = StoreClient::deadline(self.timeouts.write);
        self.store
            .delete(&rule_key(group, &domain), deadline)
            .await?;
        tracing::info!("deleted forward rule {domain} from {group}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::{shared, DynKvStore, InMemoryKvStore, KvStore};

    fn service(store: DynKvStore) -> ForwardService {
        ForwardService::new(StoreClient::new(store), Timeouts::default())
    }

    fn rule(group: &str, domain: &str, dns: &[&str]) -> ForwardRule {
        ForwardRule {
            group: group.to_string(),
            domain: domain.to_string(),
            line: "telecom".to_string(),
            dns: dns.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn domains_are_normalized() {
        assert_eq!(normalized_domain("Corp.Example.COM.").unwrap(), "corp.example.com");
        assert_eq!(normalized_domain(" intranet ").unwrap(), "intranet");
        assert!(matches!(normalized_domain(""), Err(Error::InvalidDomain(_))));
        assert!(matches!(normalized_domain("."), Err(Error::InvalidDomain(_))));
    }

    #[test]
    fn group_names_cannot_split_keys() {
        assert!(valid_group("office").is_ok());
        assert!(matches!(valid_group(""), Err(Error::InvalidGroupName(_))));
        assert!(matches!(valid_group("a/b"), Err(Error::InvalidGroupName(_))));
    }

    #[tokio::test]
    async fn empty_store_lists_placeholder_group() {
        let fwd = service(shared(InMemoryKvStore::default()));
        let groups = fwd.list_groups().await.unwrap();
        assert_eq!(groups, vec![ForwardRule::placeholder()]);
        assert_eq!(groups[0].dns, vec![String::new()]);
    }

    #[tokio::test]
    async fn put_creates_group_and_rule() {
        let store = shared(InMemoryKvStore::default());
        let fwd = service(store.clone());

        let stored = fwd
            .put_rule(rule("office", "Corp.Example.com", &["10.0.0.53"]))
            .await
            .unwrap();
        assert_eq!(stored.domain, "corp.example.com");
        fwd.put_rule(rule("office", "git.example.com", &["10.0.0.54"]))
            .await
            .unwrap();

        assert_eq!(
            store
                .read()
                .await
                .get("/forward/groups/office")
                .await
                .unwrap(),
            Some("ok".to_string())
        );
        let names: Vec<String> = fwd
            .list_groups()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.group)
            .collect();
        assert_eq!(names, vec!["office"]);

        let domains: Vec<String> = fwd
            .list_rules("office")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.domain)
            .collect();
        assert_eq!(domains, vec!["corp.example.com", "git.example.com"]);

        let found = fwd
            .get_rule("office", "CORP.example.com.")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.dns, vec!["10.0.0.53"]);
        assert!(fwd.get_rule("office", "nope.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_group_removes_rules_and_marker() {
        let store = shared(InMemoryKvStore::default());
        let fwd = service(store.clone());
        fwd.put_rule(rule("office", "a.example.com", &[])).await.unwrap();
        fwd.put_rule(rule("lab", "b.example.com", &[])).await.unwrap();

        fwd.delete_group("office").await.unwrap();

        let keys: Vec<String> = store
            .read()
            .await
            .get_prefix("/forward/")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec!["/forward/group/lab/b.example.com", "/forward/groups/lab"]
        );
    }

    #[tokio::test]
    async fn delete_rule_keeps_group() {
        let store = shared(InMemoryKvStore::default());
        let fwd = service(store.clone());
        fwd.put_rule(rule("office", "a.example.com", &[])).await.unwrap();

        fwd.delete_rule("office", "a.example.com").await.unwrap();

        assert!(fwd.list_rules("office").await.unwrap().is_empty());
        assert_eq!(fwd.list_groups().await.unwrap()[0].group, "office");
    }

    #[tokio::test]
    async fn malformed_rule_is_skipped() {
        let store = shared(InMemoryKvStore::default());
        let fwd = service(store.clone());
        fwd.put_rule(rule("office", "a.example.com", &[])).await.unwrap();
        store
            .write()
            .await
            .put("/forward/group/office/b.example.com", "[".to_string())
            .await
            .unwrap();

        assert_eq!(fwd.list_rules("office").await.unwrap().len(), 1);
        assert!(fwd.get_rule("office", "b.example.com").await.unwrap().is_none());
    }
}

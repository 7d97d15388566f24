//! Table-shaped listing responses.
//!
//! Every listing endpoint answers with the rows plus a static column schema telling a generic
//! table view what to display:
//!
//! ```json
//! { "data": [ ... ], "column": [ { "label": "IP", "prop": "ip", "width": "180" } ] }
//! ```
//!
//! Editable listings wrap each record in a [`Row`] carrying the URLs a view needs to drill down,
//! update or delete it.

use crate::acl::{HostSnapshot, PolicyBlock};
use crate::forward::ForwardRule;
use serde::Serialize;

const ACL_URL: &str = "/v1/acl/ip/cidr";
const FORWARD_URL: &str = "/v1/forward/group";

const BLOCK_ID_BASE: usize = 0;
const HOST_ID_BASE: usize = 1000;
const GROUP_ID_BASE: usize = 20_000;
const RULE_ID_BASE: usize = 30_000;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Column {
    pub label: &'static str,
    pub prop: &'static str,
    pub width: &'static str,
}

const fn column(label: &'static str, prop: &'static str, width: &'static str) -> Column {
    Column { label, prop, width }
}

pub(super) const ACL_COLUMNS: &[Column] = &[
    column("IP", "ip", "180"),
    column("CIDR", "cidr", "180"),
    column("Master line", "masterLineDnsReStr", "100"),
    column("Master DNS", "masterDns", "140"),
    column("Backup line", "backupLineDnsReStr", "100"),
    column("Backup DNS", "backupDns", "140"),
    column("Forward groups", "forwardGroup", "100"),
];

pub(super) const FORWARD_COLUMNS: &[Column] = &[
    column("Group", "groupName", "150"),
    column("Domain", "domain", "150"),
    column("Line", "lineDnsReStr", "150"),
    column("DNS", "dns", "250"),
];

pub(super) const RESOLVER_COLUMNS: &[Column] = &[
    column("Name", "name", "100"),
    column("Status", "status", "100"),
];

pub(super) const LINE_DNS_COLUMNS: &[Column] = &[
    column("Zone", "zoneName", "100"),
    column("Line", "lineType", "100"),
    column("Address", "addr", "150"),
];

#[derive(Serialize, Debug)]
pub(super) struct Table<T> {
    pub data: Vec<T>,
    pub column: &'static [Column],
}

impl<T> Table<T> {
    pub fn new(data: Vec<T>, column: &'static [Column]) -> Self {
        Table { data, column }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct Row<T> {
    #[serde(flatten)]
    pub record: T,
    pub id: usize,
    pub has_children: bool,
    pub data_url: String,
    pub update_url: String,
    pub del_url: String,
}

pub(super) fn block_rows(blocks: Vec<PolicyBlock>) -> Table<Row<PolicyBlock>> {
    let rows = blocks
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            if block.is_placeholder() {
                return Row {
                    record: block,
                    id: BLOCK_ID_BASE + i,
                    has_children: false,
                    data_url: String::new(),
                    update_url: ACL_URL.to_string(),
                    del_url: String::new(),
                };
            }
            let url = format!("{ACL_URL}/{}", block.cidr);
            Row {
                record: block,
                id: BLOCK_ID_BASE + i,
                has_children: true,
                data_url: url.clone(),
                update_url: ACL_URL.to_string(),
                del_url: url,
            }
        })
        .collect();
    Table::new(rows, ACL_COLUMNS)
}

pub(super) fn host_rows(snapshots: Vec<HostSnapshot>) -> Table<Row<HostSnapshot>> {
    let rows = snapshots
        .into_iter()
        .enumerate()
        .map(|(i, snapshot)| {
            let del_url = format!("{ACL_URL}/{}", snapshot.cidr);
            Row {
                record: snapshot,
                id: HOST_ID_BASE + i,
                has_children: false,
                data_url: String::new(),
                update_url: ACL_URL.to_string(),
                del_url,
            }
        })
        .collect();
    Table::new(rows, ACL_COLUMNS)
}

pub(super) fn group_rows(groups: Vec<ForwardRule>) -> Table<Row<ForwardRule>> {
    let rows = groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            if group.is_placeholder() {
                return Row {
                    record: group,
                    id: GROUP_ID_BASE + i,
                    has_children: false,
                    data_url: String::new(),
                    update_url: FORWARD_URL.to_string(),
                    del_url: String::new(),
                };
            }
            let url = format!("{FORWARD_URL}/{}", group.group);
            Row {
                record: group,
                id: GROUP_ID_BASE + i,
                has_children: true,
                data_url: url.clone(),
                update_url: FORWARD_URL.to_string(),
                del_url: url,
            }
        })
        .collect();
    Table::new(rows, FORWARD_COLUMNS)
}

pub(super) fn rule_rows(rules: Vec<ForwardRule>) -> Table<Row<ForwardRule>> {
    let rows = rules
        .into_iter()
        .enumerate()
        .map(|(i, rule)| {
            let del_url = format!("{FORWARD_URL}/{}/{}", rule.group, rule.domain);
            Row {
                record: rule,
                id: RULE_ID_BASE + i,
                has_children: false,
                data_url: String::new(),
                update_url: FORWARD_URL.to_string(),
                del_url,
            }
        })
        .collect();
    Table::new(rows, FORWARD_COLUMNS)
}

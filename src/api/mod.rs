//! HTTP API for managing ACL and forwarding policy.
//!
//! All listing endpoints answer with a `{"data": [...], "column": [...]}` table. Mutating
//! endpoints answer `{"mesg": "update done"}`. Errors answer `{"error": "..."}` with a status
//! matching the failure: 400 for invalid input, 404 for missing entries, 504 when the store
//! timed out.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET), `/v1/ping` (GET)
//!
//!   Liveness. Return `{"ok":"healthy"}` and `pong` respectively.
//!
//! ## `/v1/acl/ip/cidr` (GET, POST)
//!
//!   `GET` lists every policy block. With no block stored a single empty placeholder row is
//!   returned.
//!
//!   `POST` stores a policy block and materializes it over every host in its range:
//!
//!   ```json
//!   {
//!     "cidr": "10.0.0.0/24", "netmask": 24,
//!     "masterLineDnsReStr": "telecom", "masterDns": ["10.1.1.1"],
//!     "backupLineDnsReStr": "unicom", "backupDns": ["10.2.2.2"],
//!     "forwardGroup": ["office"], "timeout": 5
//!   }
//!   ```
//!
//!   A host already holding a policy from a block with a strictly greater `netmask` keeps it.
//!
//! ## `/v1/acl/ip/cidr/:network/:netmask` (GET, DELETE)
//!
//!   `GET` lists the host policies inside the block, in address order. `DELETE` removes the
//!   block and every host policy inside its range.
//!
//! ## `/v1/acl/ip/pool` (GET), `/v1/acl/ip/pool/:ip` (GET)
//!
//!   Every materialized host policy, or the one for a single address (404 if none).
//!
//! ## `/v1/forward/groups` (GET), `/v1/forward/group` (POST)
//!
//!   List forwarding groups, or store one domain rule (creating its group as needed):
//!
//!   ```json
//!   { "groupName": "office", "domain": "corp.example.com",
//!     "lineDnsReStr": "telecom", "dns": ["10.0.0.53"] }
//!   ```
//!
//! ## `/v1/forward/group/:group` (GET, DELETE), `/v1/forward/group/:group/:domain` (GET, DELETE)
//!
//!   List or delete a group's rules, or get or delete a single rule.
//!
//! ## `/v1/smartdns` (GET), `/v1/linedns` (GET)
//!
//!   Registered resolver instances and line DNS servers.

mod api_error;
mod routes;
pub mod server;
mod table;

pub use server::{new, router};

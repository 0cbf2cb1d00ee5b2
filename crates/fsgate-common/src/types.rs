use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability bits for one subject class of a POSIX-style permission
/// triple. Only the combinations the gateway evaluates are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionBits {
    None,
    Read,
    ReadWrite,
    ReadExecute,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTriple {
    pub owner: PermissionBits,
    pub group: PermissionBits,
    pub other: PermissionBits,
}

impl PermissionTriple {
    pub fn new(owner: PermissionBits, group: PermissionBits, other: PermissionBits) -> Self {
        Self { owner, group, other }
    }
}

/// The identity the gateway process acts as. Resolved once at startup
/// and shared read-only across all request tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user: String,
    pub groups: HashSet<String>,
}

impl Identity {
    pub fn new(user: impl Into<String>, groups: impl IntoIterator<Item = String>) -> Self {
        Self {
            user: user.into(),
            groups: groups.into_iter().collect(),
        }
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Metadata snapshot of one backend node, fetched per request. The
/// backend stays the source of truth; snapshots are never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub is_dir: bool,
    pub size: i64,
    pub modified: DateTime<Utc>,
    pub owner: String,
    pub group: String,
    pub permissions: PermissionTriple,
}

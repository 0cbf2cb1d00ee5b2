use std::collections::BTreeMap;
use std::io::Cursor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fsgate_common::error::{GatewayError, Result};
use fsgate_common::types::{FileInfo, PermissionTriple};

use crate::traits::{FileReader, RemoteFs};

#[derive(Debug, Clone)]
struct Node {
    is_dir: bool,
    data: Vec<u8>,
    modified: DateTime<Utc>,
    owner: String,
    group: String,
    permissions: PermissionTriple,
}

/// In-memory tree backend. Gives tests full control over ownership,
/// permissions and timestamps without touching a real store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<String, Node>,
    unreachable: bool,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as a connection-level error, to
    /// exercise the backend-unavailable paths.
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    pub fn add_dir(
        &mut self,
        path: &str,
        owner: &str,
        group: &str,
        permissions: PermissionTriple,
        modified: DateTime<Utc>,
    ) -> &mut Self {
        self.insert(path, Node {
            is_dir: true,
            data: Vec::new(),
            modified,
            owner: owner.to_string(),
            group: group.to_string(),
            permissions,
        })
    }

    pub fn add_file(
        &mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        owner: &str,
        group: &str,
        permissions: PermissionTriple,
        modified: DateTime<Utc>,
    ) -> &mut Self {
        self.insert(path, Node {
            is_dir: false,
            data: data.into(),
            modified,
            owner: owner.to_string(),
            group: group.to_string(),
            permissions,
        })
    }

    fn insert(&mut self, path: &str, node: Node) -> &mut Self {
        self.nodes.insert(normalize(path), node);
        self
    }

    fn node(&self, path: &str) -> Option<(&str, &Node)> {
        let normalized = normalize(path);
        self.nodes
            .get_key_value(&normalized)
            .map(|(key, node)| (key.as_str(), node))
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            Err(GatewayError::BackendUnavailable(
                "memory backend marked unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn info(path: &str, node: &Node) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            is_dir: node.is_dir,
            size: node.data.len() as i64,
            modified: node.modified,
            owner: node.owner.clone(),
            group: node.group.clone(),
            permissions: node.permissions,
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn stat(&self, path: &str) -> Result<FileInfo> {
        self.check_reachable()?;
        self.node(path)
            .map(|(key, node)| Self::info(key, node))
            .ok_or_else(|| GatewayError::NotFound(normalize(path)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.check_reachable()?;
        Ok(self.node(path).is_some())
    }

    async fn list(&self, path: &str) -> Result<Vec<FileInfo>> {
        self.check_reachable()?;
        let normalized = normalize(path);
        if self.node(&normalized).is_none() {
            return Err(GatewayError::NotFound(normalized));
        }
        let children = self
            .nodes
            .iter()
            .filter(|(key, _)| parent_of(key) == Some(normalized.as_str()))
            .map(|(key, node)| Self::info(key, node))
            .collect();
        Ok(children)
    }

    async fn open(&self, path: &str) -> Result<Box<dyn FileReader>> {
        self.check_reachable()?;
        let (key, node) = self
            .node(path)
            .ok_or_else(|| GatewayError::NotFound(normalize(path)))?;
        if node.is_dir {
            return Err(GatewayError::Internal(format!("{key} is a directory")));
        }
        Ok(Box::new(Cursor::new(node.data.clone())))
    }
}

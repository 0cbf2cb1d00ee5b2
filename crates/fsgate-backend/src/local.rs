use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fsgate_common::error::{GatewayError, Result};
use fsgate_common::types::{FileInfo, PermissionBits, PermissionTriple};
use tokio::fs;
use tracing::debug;

use crate::traits::{FileReader, RemoteFs};

/// Backend serving a local directory tree, mainly so the gateway binary
/// has a real target. Owner and group are the numeric uid/gid rendered
/// as strings; permissions come straight from the mode bits.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn disk_path(&self, path: &str) -> Result<PathBuf> {
        let relative = path.trim_start_matches('/');
        let candidate = Path::new(relative);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(GatewayError::NotFound(path.to_string()));
        }
        Ok(self.root.join(candidate))
    }

    fn info_from_metadata(path: &str, meta: &std::fs::Metadata) -> FileInfo {
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        FileInfo {
            path: path.to_string(),
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() as i64 },
            modified,
            owner: meta.uid().to_string(),
            group: meta.gid().to_string(),
            permissions: triple_from_mode(meta.mode()),
        }
    }
}

fn bits_from_rwx(read: bool, write: bool, execute: bool) -> PermissionBits {
    match (read, write, execute) {
        (true, true, true) => PermissionBits::All,
        (true, false, true) => PermissionBits::ReadExecute,
        (true, true, false) => PermissionBits::ReadWrite,
        (true, false, false) => PermissionBits::Read,
        _ => PermissionBits::None,
    }
}

fn triple_from_mode(mode: u32) -> PermissionTriple {
    let class = |shift: u32| {
        let bits = (mode >> shift) & 0o7;
        bits_from_rwx(bits & 0o4 != 0, bits & 0o2 != 0, bits & 0o1 != 0)
    };
    PermissionTriple::new(class(6), class(3), class(0))
}

fn map_io_error(path: &str, err: std::io::Error) -> GatewayError {
    if err.kind() == ErrorKind::NotFound {
        GatewayError::NotFound(path.to_string())
    } else {
        GatewayError::Io(err)
    }
}

#[async_trait]
impl RemoteFs for LocalFs {
    async fn stat(&self, path: &str) -> Result<FileInfo> {
        let disk = self.disk_path(path)?;
        let meta = fs::metadata(&disk)
            .await
            .map_err(|err| map_io_error(path, err))?;
        Ok(Self::info_from_metadata(path, &meta))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let disk = self.disk_path(path)?;
        Ok(fs::try_exists(&disk).await?)
    }

    async fn list(&self, path: &str) -> Result<Vec<FileInfo>> {
        let disk = self.disk_path(path)?;
        debug!(path, "listing directory");
        let mut read_dir = fs::read_dir(&disk)
            .await
            .map_err(|err| map_io_error(path, err))?;
        let base = path.trim_end_matches('/');
        let mut children = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let child_path = format!("{base}/{name}");
            match entry.metadata().await {
                Ok(meta) => children.push(Self::info_from_metadata(&child_path, &meta)),
                // Entry vanished between readdir and stat; skip it.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(GatewayError::Io(err)),
            }
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    async fn open(&self, path: &str) -> Result<Box<dyn FileReader>> {
        let disk = self.disk_path(path)?;
        let file = fs::File::open(&disk)
            .await
            .map_err(|err| map_io_error(path, err))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn mode_bits_map_to_triples() {
        let triple = triple_from_mode(0o754);
        assert_eq!(triple.owner, PermissionBits::All);
        assert_eq!(triple.group, PermissionBits::ReadExecute);
        assert_eq!(triple.other, PermissionBits::Read);

        // Write-only and execute-only collapse to None.
        let triple = triple_from_mode(0o621);
        assert_eq!(triple.owner, PermissionBits::ReadWrite);
        assert_eq!(triple.group, PermissionBits::None);
        assert_eq!(triple.other, PermissionBits::None);
    }

    #[tokio::test]
    async fn stat_and_list_read_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("hello.txt");
        std::fs::write(&file_path, b"hello").unwrap();
        std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let fs = LocalFs::new(dir.path().to_path_buf());
        let info = fs.stat("/hello.txt").await.unwrap();
        assert!(!info.is_dir);
        assert_eq!(info.size, 5);
        assert_eq!(info.permissions.other, PermissionBits::Read);

        let children = fs.list("/").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path, "/hello.txt");
    }

    #[tokio::test]
    async fn parent_components_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path().to_path_buf());
        assert!(matches!(
            fs.stat("/../etc/passwd").await,
            Err(GatewayError::NotFound(_))
        ));
    }
}

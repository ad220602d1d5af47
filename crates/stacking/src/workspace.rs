//! Per-worker scratch directories.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

/// Scratch directory `<work_dir>/worker<index>` owned by exactly one worker.
///
/// Extracted band files and the virtual descriptor live here while one item
/// is processed; the directory is emptied after every item and removed when
/// the worker stops.
#[derive(Debug)]
pub struct Workspace {
    index: usize,
    path: PathBuf,
}

impl Workspace {
    /// Path a worker's workspace occupies, without creating it.
    pub fn path_for(work_dir: &Path, index: usize) -> PathBuf {
        work_dir.join(format!("worker{}", index))
    }

    /// Create (or reuse) the workspace for worker `index`.
    ///
    /// Leftovers from an earlier run are purged so the worker starts empty.
    pub async fn create(work_dir: &Path, index: usize) -> io::Result<Self> {
        let path = Self::path_for(work_dir, index);
        fs::create_dir_all(&path).await?;
        let workspace = Self { index, path };
        workspace.purge().await?;
        debug!(worker = index, path = %workspace.path.display(), "Workspace ready");
        Ok(workspace)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove everything inside the workspace, keeping the directory itself.
    pub async fn purge(&self) -> io::Result<()> {
        let mut entries = fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            } else {
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    /// Delete the workspace directory and its contents.
    pub async fn remove(self) -> io::Result<()> {
        match fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(worker = self.index, "Workspace already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_names_directory_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), 7).await.unwrap();
        assert_eq!(ws.path(), dir.path().join("worker7"));
        assert_eq!(ws.index(), 7);
        assert!(ws.path().is_dir());
    }

    #[tokio::test]
    async fn test_create_clears_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("worker0");
        std::fs::create_dir_all(stale.join("nested")).unwrap();
        std::fs::write(stale.join("old.tif"), b"x").unwrap();

        let ws = Workspace::create(dir.path(), 0).await.unwrap();
        assert_eq!(std::fs::read_dir(ws.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_purge_keeps_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), 1).await.unwrap();
        std::fs::write(ws.path().join("a.tif"), b"a").unwrap();
        std::fs::create_dir(ws.path().join("sub")).unwrap();
        std::fs::write(ws.path().join("sub/b.tif"), b"b").unwrap();

        ws.purge().await.unwrap();
        assert!(ws.path().is_dir());
        assert_eq!(std::fs::read_dir(ws.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_deletes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), 2).await.unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(path.join("a.tif"), b"a").unwrap();

        ws.remove().await.unwrap();
        assert!(!path.exists());
    }
}

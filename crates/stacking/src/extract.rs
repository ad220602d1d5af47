//! Safe archive extraction into a worker workspace.
//!
//! Every entry is validated before anything is written: its name must be a
//! relative path without `..` that stays inside the workspace, and link
//! entries must point inside it as well. One bad entry rejects the whole
//! archive.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use tar::{Archive, EntryType};
use tracing::debug;

use crate::error::{Result, StackError};

/// Unpack `archive` into `workspace`, returning the regular files written.
pub fn extract(archive: &Path, workspace: &Path) -> Result<Vec<PathBuf>> {
    let root = workspace.canonicalize()?;

    validate_entries(archive, &root)?;

    let mut tar = open(archive)?;
    let entries = tar
        .entries()
        .map_err(|e| StackError::extraction(archive, e))?;

    let mut written = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| StackError::extraction(archive, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| StackError::extraction(archive, e))?
            .into_owned();
        let dest = resolve_within(&root, &entry_path)
            .ok_or_else(|| traversal(archive, &entry_path))?;
        let is_file = entry.header().entry_type().is_file();

        let unpacked = entry
            .unpack_in(&root)
            .map_err(|e| StackError::extraction(archive, e))?;
        if !unpacked {
            return Err(traversal(archive, &entry_path));
        }
        if is_file {
            written.push(dest);
        }
    }

    debug!(
        archive = %archive.display(),
        files = written.len(),
        "Archive extracted"
    );
    Ok(written)
}

/// Check every entry (and link target) without writing anything.
fn validate_entries(archive: &Path, root: &Path) -> Result<()> {
    let mut tar = open(archive)?;
    let entries = tar
        .entries()
        .map_err(|e| StackError::extraction(archive, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| StackError::extraction(archive, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| StackError::extraction(archive, e))?
            .into_owned();

        let dest = resolve_within(root, &entry_path)
            .ok_or_else(|| traversal(archive, &entry_path))?;
        // Names must be relative and free of `..`; the unpacker rewrites or
        // refuses anything else.
        if entry_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        }) {
            return Err(traversal(archive, &entry_path));
        }

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            let target = entry
                .link_name()
                .map_err(|e| StackError::extraction(archive, e))?
                .ok_or_else(|| StackError::extraction(archive, "link entry without target"))?
                .into_owned();

            // Symlinks resolve from their own directory, hard links from the root.
            let base = if entry_type == EntryType::Symlink {
                dest.parent().unwrap_or(root).to_path_buf()
            } else {
                root.to_path_buf()
            };
            let resolved = lexical_join(&base, &target);
            if !resolved.starts_with(root) {
                return Err(traversal(archive, &target));
            }
        }
    }

    Ok(())
}

fn open(archive: &Path) -> Result<Archive<File>> {
    let file = File::open(archive).map_err(|e| StackError::extraction(archive, e))?;
    Ok(Archive::new(file))
}

fn traversal(archive: &Path, entry: &Path) -> StackError {
    StackError::extraction(
        archive,
        format!("attempted path traversal via entry '{}'", entry.display()),
    )
}

/// Resolve `entry` against `root`; `None` if the result leaves `root`.
pub(crate) fn resolve_within(root: &Path, entry: &Path) -> Option<PathBuf> {
    let resolved = lexical_join(root, entry);
    resolved.starts_with(root).then_some(resolved)
}

/// Join without touching the filesystem, collapsing `.` and `..`.
fn lexical_join(base: &Path, relative: &Path) -> PathBuf {
    let mut resolved = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                resolved.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
        }
    }
    resolved
}

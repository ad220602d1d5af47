//! Input tree scanning for scene archives.

use std::path::{Path, PathBuf};

use scene_common::ProductCode;
use walkdir::WalkDir;

use crate::error::Result;

/// Walks an input tree and yields archives whose name ends with `<product>.tar`.
///
/// Traversal order is whatever the filesystem returns; nothing is sorted or
/// deduplicated. The sequence is lazy and can be consumed once.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    suffix: String,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, product: &ProductCode) -> Self {
        Self {
            root: root.into(),
            suffix: product.archive_suffix(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archives(self) -> Archives {
        Archives {
            walker: WalkDir::new(&self.root).into_iter(),
            suffix: self.suffix,
        }
    }
}

impl IntoIterator for Scanner {
    type Item = Result<PathBuf>;
    type IntoIter = Archives;

    fn into_iter(self) -> Self::IntoIter {
        self.archives()
    }
}

/// Lazy iterator over matching archive paths.
pub struct Archives {
    walker: walkdir::IntoIter,
    suffix: String,
}

impl Iterator for Archives {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(&self.suffix));
            if matches {
                return Some(Ok(entry.into_path()));
            }
        }
    }
}

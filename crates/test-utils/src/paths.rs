//! Path utilities for test scratch trees.

use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Standard run layout inside one scratch directory: `input/`, `output/`, `work/`.
#[derive(Debug)]
pub struct RunDirs {
    tmp: tempfile::TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub work: PathBuf,
}

impl RunDirs {
    pub fn new() -> Self {
        let root = temp_test_dir_with_prefix("stacker_run_");
        let input = root.path().join("input");
        let output = root.path().join("output");
        let work = root.path().join("work");
        for dir in [&input, &output, &work] {
            std::fs::create_dir_all(dir).expect("Failed to create run directory");
        }
        Self {
            tmp: root,
            input,
            output,
            work,
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }
}

impl Default for RunDirs {
    fn default() -> Self {
        Self::new()
    }
}

/// Lists every regular file under `dir`, recursively, sorted.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

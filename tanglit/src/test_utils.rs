//! Shared test utilities.

use std::fs;
use std::path::{Path, PathBuf};

/// Writes a literate document into `dir` and returns its path.
pub fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

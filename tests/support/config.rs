use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// A config file inside its own temporary directory.
pub struct TempConfig {
    dir: TempDir,
    path: PathBuf,
}

impl TempConfig {
    pub fn write(contents: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("stowage.toml");
        fs::write(&path, contents).expect("write temp config");
        Self { dir, path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Directory holding the config, for sibling files such as databases.
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

//! Where declaration text comes from. The manager only needs to read a file
//! by path and to check whether a candidate path exists.
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

pub trait SourceLoader: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// Reads straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskSource;

impl SourceLoader for DiskSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory file table, keyed by the exact path the manager will ask for.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceLoader for MemorySource {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", path.display()))
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

//! In-memory filesystem implementation.
//!
//! [`InMemoryFs`] stores all entries in a `RwLock<HashMap>` keyed by
//! normalized absolute path. It is the default filesystem of
//! [`Shell::new()`](crate::Shell::new) and seeds the directories the shell
//! expects: `/`, `/tmp`, `/home/user`, `/usr/bin`, `/bin`, `/dev`.

// RwLock read()/write().unwrap() only panics on lock poisoning (prior panic
// while holding the lock); corrupted state should not propagate.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use super::traits::{fs_errors, DirEntry, FileSystem, FileType, Metadata};
use crate::error::Result;

/// In-memory filesystem.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Directory { modified: SystemTime },
}

impl FsEntry {
    fn metadata(&self) -> Metadata {
        match self {
            FsEntry::File { content, modified } => Metadata {
                file_type: FileType::File,
                size: content.len() as u64,
                modified: *modified,
            },
            FsEntry::Directory { modified } => Metadata {
                file_type: FileType::Directory,
                size: 0,
                modified: *modified,
            },
        }
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a new in-memory filesystem with the default directory layout.
    pub fn new() -> Self {
        let fs = Self {
            entries: RwLock::new(HashMap::new()),
        };
        for dir in ["/", "/tmp", "/home", "/home/user", "/usr", "/usr/bin", "/bin", "/dev"] {
            fs.entries.write().unwrap().insert(
                PathBuf::from(dir),
                FsEntry::Directory {
                    modified: SystemTime::now(),
                },
            );
        }
        fs
    }

    /// Seed a file synchronously, creating parent directories as needed.
    /// Used by the shell builder before any async context exists.
    pub fn seed_file(&self, path: &Path, content: &[u8]) {
        let mut entries = self.entries.write().unwrap();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            entries.entry(dir.to_path_buf()).or_insert(FsEntry::Directory {
                modified: SystemTime::now(),
            });
            parent = dir.parent();
        }
        entries.insert(
            path.to_path_buf(),
            FsEntry::File {
                content: content.to_vec(),
                modified: SystemTime::now(),
            },
        );
    }

    fn parent_is_dir(entries: &HashMap<PathBuf, FsEntry>, path: &Path) -> bool {
        match path.parent() {
            Some(parent) => matches!(entries.get(parent), Some(FsEntry::Directory { .. })),
            // Root has no parent
            None => true,
        }
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let entries = self.entries.read().unwrap();
        match entries.get(path) {
            Some(FsEntry::File { content, .. }) => Ok(content.clone()),
            Some(FsEntry::Directory { .. }) => Err(fs_errors::is_a_directory()),
            None => Err(fs_errors::not_found("No such file or directory")),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if matches!(entries.get(path), Some(FsEntry::Directory { .. })) {
            return Err(fs_errors::is_a_directory());
        }
        if !Self::parent_is_dir(&entries, path) {
            return Err(fs_errors::parent_not_found());
        }
        entries.insert(
            path.to_path_buf(),
            FsEntry::File {
                content: content.to_vec(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(path) {
            Some(FsEntry::File {
                content: existing,
                modified,
            }) => {
                existing.extend_from_slice(content);
                *modified = SystemTime::now();
                Ok(())
            }
            Some(FsEntry::Directory { .. }) => Err(fs_errors::is_a_directory()),
            None => {
                if !Self::parent_is_dir(&entries, path) {
                    return Err(fs_errors::parent_not_found());
                }
                entries.insert(
                    path.to_path_buf(),
                    FsEntry::File {
                        content: content.to_vec(),
                        modified: SystemTime::now(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(path) {
            Some(FsEntry::Directory { .. }) if recursive => return Ok(()),
            Some(_) => return Err(fs_errors::already_exists("already exists")),
            None => {}
        }
        if recursive {
            let mut parent = path.parent();
            while let Some(dir) = parent {
                match entries.get(dir) {
                    Some(FsEntry::Directory { .. }) => break,
                    Some(_) => return Err(fs_errors::not_a_directory()),
                    None => {
                        entries.insert(
                            dir.to_path_buf(),
                            FsEntry::Directory {
                                modified: SystemTime::now(),
                            },
                        );
                    }
                }
                parent = dir.parent();
            }
        } else if !Self::parent_is_dir(&entries, path) {
            return Err(fs_errors::parent_not_found());
        }
        entries.insert(
            path.to_path_buf(),
            FsEntry::Directory {
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(path) {
            None => return Err(fs_errors::not_found("No such file or directory")),
            Some(FsEntry::File { .. }) => {
                entries.remove(path);
                return Ok(());
            }
            Some(FsEntry::Directory { .. }) => {}
        }
        let children: Vec<PathBuf> = entries
            .keys()
            .filter(|p| p.starts_with(path) && p.as_path() != path)
            .cloned()
            .collect();
        if !children.is_empty() && !recursive {
            return Err(fs_errors::directory_not_empty());
        }
        for child in children {
            entries.remove(&child);
        }
        entries.remove(path);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let entries = self.entries.read().unwrap();
        entries
            .get(path)
            .map(FsEntry::metadata)
            .ok_or_else(|| fs_errors::not_found("No such file or directory"))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries = self.entries.read().unwrap();
        match entries.get(path) {
            Some(FsEntry::Directory { .. }) => {}
            Some(_) => return Err(fs_errors::not_a_directory()),
            None => return Err(fs_errors::not_found("No such file or directory")),
        }
        let mut listing = Vec::new();
        for (entry_path, entry) in entries.iter() {
            if entry_path.parent() == Some(path) {
                if let Some(name) = entry_path.file_name() {
                    listing.push(DirEntry {
                        name: name.to_string_lossy().to_string(),
                        metadata: entry.metadata(),
                    });
                }
            }
        }
        Ok(listing)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.entries.read().unwrap().contains_key(path))
    }
}

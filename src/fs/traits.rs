//! Filesystem trait definitions.
//!
//! [`FileSystem`] is the capability the shell core consumes for every path
//! lookup, read, write and directory listing. Implementations must enforce
//! POSIX-like semantics:
//!
//! 1. A file and a directory cannot share a path.
//! 2. `write_file` / `append_file` fail with "is a directory" on a directory.
//! 3. `mkdir` fails with "already exists" unless `recursive=true` and the
//!    existing entry is a directory.
//! 4. Write operations require the parent directory to exist (except with
//!    `recursive=true` for mkdir).

use async_trait::async_trait;
use std::io::{Error as IoError, ErrorKind};
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

/// Standard filesystem errors for consistent messages across implementations.
pub mod fs_errors {
    use super::*;

    /// Error for attempting to write to a directory.
    #[inline]
    pub fn is_a_directory() -> crate::Error {
        IoError::other("is a directory").into()
    }

    /// Error for a path already existing (mkdir without recursive).
    #[inline]
    pub fn already_exists(msg: &str) -> crate::Error {
        IoError::new(ErrorKind::AlreadyExists, msg).into()
    }

    /// Error for a missing parent directory.
    #[inline]
    pub fn parent_not_found() -> crate::Error {
        IoError::new(ErrorKind::NotFound, "parent directory not found").into()
    }

    /// Error for file or directory not found.
    #[inline]
    pub fn not_found(msg: &str) -> crate::Error {
        IoError::new(ErrorKind::NotFound, msg).into()
    }

    /// Error for a directory operation on a file.
    #[inline]
    pub fn not_a_directory() -> crate::Error {
        IoError::other("not a directory").into()
    }

    /// Error for non-empty directory removal without the recursive flag.
    #[inline]
    pub fn directory_not_empty() -> crate::Error {
        IoError::other("directory not empty").into()
    }
}

/// Async virtual filesystem trait.
///
/// All implementations must be `Send + Sync`; use interior mutability for
/// mutable state. The shell serializes its calls, so implementations may be
/// fulfilled synchronously.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's contents as bytes.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write contents to a file, creating or truncating it. The parent
    /// directory must exist.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Append contents to a file, creating it if necessary.
    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory. With `recursive`, create missing parents as well
    /// (like `mkdir -p`).
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a file or directory. A non-empty directory is removed only
    /// with `recursive`.
    async fn remove(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Get file or directory metadata.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// List directory contents. Entry order is unspecified; callers sort.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Check whether a path exists.
    async fn exists(&self, path: &Path) -> Result<bool>;
}

/// File or directory metadata, returned by [`FileSystem::stat`].
#[derive(Debug, Clone)]
pub struct Metadata {
    /// The type of this entry.
    pub file_type: FileType,
    /// File size in bytes. For directories this is 0.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            modified: SystemTime::now(),
        }
    }
}

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file containing data.
    File,
    /// Directory that can contain other entries.
    Directory,
}

impl FileType {
    /// Returns `true` if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns `true` if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// An entry in a directory listing, returned by [`FileSystem::read_dir`].
/// Contains the entry name (not the full path) and its metadata.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name (basename only).
    pub name: String,
    /// Metadata for this entry.
    pub metadata: Metadata,
}

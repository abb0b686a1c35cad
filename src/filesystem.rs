//! Filesystem access capability
//!
//! Every component that touches the disk goes through the [`FileSystem`]
//! trait. The binary uses [`RealFs`]; tests use [`MemoryFs`], an in-memory
//! filesystem that records every content read so tests can assert exactly
//! which files a component opened.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use log::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Trait for filesystem operations - allows instrumentation in tests
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Read a file's content as UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Current modification time, or `None` if the file does not exist.
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    /// Whether `path` names an existing file.
    fn is_file(&self, path: &Path) -> bool;

    /// Every file below `dir`, recursively, in sorted order. Lists names
    /// only; file content is never opened.
    ///
    /// Subdirectories for which `prune` returns `true` are not entered.
    /// Dangling links and link loops are skipped.
    fn list_files(&self, dir: &Path, prune: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Write a file so that readers observe either the old or the new
    /// content, never a partial write.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file. Returns `false` if it did not exist.
    fn remove_file(&self, path: &Path) -> Result<bool>;
}

/// The default implementation of `FileSystem`, backed by the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_files(&self, dir: &Path, prune: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && prune(e.path())));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_broken_link(&e) => {
                    let path = e.path().unwrap_or(dir);
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    return Err(Error::io(path, e.into()));
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(path, contents).map_err(|e| Error::io(path, e))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        self.write(&temp_path, contents)?;
        std::fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

/// A link loop, or a link whose target is gone.
fn is_broken_link(e: &walkdir::Error) -> bool {
    e.loop_ancestor().is_some()
        || (e.depth() > 0
            && e.io_error()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound))
}

/// Represents an in-memory file with content and modification time
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// File modification time
    pub modified_time: SystemTime,
}

/// In-memory filesystem with a logical clock and a read log.
///
/// Each write advances the clock by one second, so a file written later
/// always has a strictly newer modification time.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<HashMap<PathBuf, File>>,
    reads: Mutex<Vec<PathBuf>>,
    clock: AtomicU64,
}

impl MemoryFs {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, File>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tick(&self) -> SystemTime {
        let ticks = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(ticks)
    }

    /// Add or replace a file with string content. Not recorded as a read.
    pub fn add_file_string<P: AsRef<Path>>(&self, path: P, content: &str) {
        let modified_time = self.tick();
        self.files().insert(
            path.as_ref().to_path_buf(),
            File {
                content: content.as_bytes().to_vec(),
                modified_time,
            },
        );
    }

    /// Bump a file's modification time, creating it empty if absent.
    pub fn touch<P: AsRef<Path>>(&self, path: P) {
        let modified_time = self.tick();
        self.files()
            .entry(path.as_ref().to_path_buf())
            .and_modify(|file| file.modified_time = modified_time)
            .or_insert(File {
                content: Vec::new(),
                modified_time,
            });
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files().contains_key(path.as_ref())
    }

    /// Get a copy of a file without recording a read
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<File> {
        self.files().get(path.as_ref()).cloned()
    }

    /// Paths whose content was read, in order, including repeats.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget previously recorded reads.
    pub fn clear_reads(&self) {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files().len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_path_buf());
        let file = self.files().get(path).cloned().ok_or_else(|| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            )
        })?;
        String::from_utf8(file.content).map_err(|e| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.files().get(path).map(|file| file.modified_time)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn list_files(&self, dir: &Path, prune: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .files()
            .keys()
            .filter(|file| file.starts_with(dir) && file.as_path() != dir)
            .filter(|file| {
                !file
                    .ancestors()
                    .skip(1)
                    .take_while(|ancestor| *ancestor != dir)
                    .any(|ancestor| prune(ancestor))
            })
            .cloned()
            .collect();
        files.sort();
        Ok(files)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let modified_time = self.tick();
        self.files().insert(
            path.to_path_buf(),
            File {
                content: contents.to_vec(),
                modified_time,
            },
        );
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        Ok(self.files().remove(path).is_some())
    }
}

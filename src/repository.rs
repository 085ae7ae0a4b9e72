//! The on-disk backup repository: a `data/` shadow tree for file bodies and
//! a line-oriented `index.txt` mapping relative paths to their metadata.
//!
//! Bodies exist only for regular files. Symlinks, FIFOs and the reserved
//! special types are metadata-only entries; their index line carries
//! everything needed to recreate them.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BackupError;
use crate::fsx::{self, FileType};
use crate::metadata::Metadata;

/// Turn a relative path into the portable `/`-separated key used by the
/// index and the package format.
pub(crate) fn normalize_rel(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    let trimmed = s.strip_prefix("./").unwrap_or(&s);
    trimmed.to_string()
}

/// In-memory index: unique relative paths in insertion order.
#[derive(Default)]
struct Index {
    order: Vec<String>,
    map: HashMap<String, Metadata>,
}

impl Index {
    fn insert(&mut self, rel: &str, meta: Metadata) {
        if !self.map.contains_key(rel) {
            self.order.push(rel.to_string());
        }
        self.map.insert(rel.to_string(), meta);
    }

    fn get(&self, rel: &str) -> Option<&Metadata> {
        self.map.get(rel)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.map.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }
}

pub struct Repository {
    root: PathBuf,
    data_dir: PathBuf,
    index_path: PathBuf,
    index: Index,
}

impl Repository {
    /// Record the repository paths. Touches nothing on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data_dir = root.join("data");
        let index_path = root.join("index.txt");
        Repository { root, data_dir, index_path, index: Index::default() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the repository directory structure exists. Idempotent.
    pub fn initialize(&self) -> Result<(), BackupError> {
        fsx::create_dir_all(&self.root).map_err(|e| BackupError::io(e, &self.root))?;
        fsx::create_dir_all(&self.data_dir).map_err(|e| BackupError::io(e, &self.data_dir))?;
        Ok(())
    }

    fn storage_path(&self, rel: &str) -> PathBuf {
        self.data_dir.join(Path::new(rel))
    }

    /// Store one entry: the metadata is recorded in the index first, then
    /// the body is copied for types that have one (regular files only —
    /// symlink targets live in the metadata, never as a body in `data/`).
    ///
    /// A failed body copy reports an error but leaves the index entry in
    /// place. Repeating a store with identical inputs is idempotent.
    pub fn store(
        &mut self,
        source_path: &Path,
        rel: &str,
        metadata: &Metadata,
    ) -> Result<(), BackupError> {
        self.index.insert(rel, metadata.clone());

        if metadata.file_type == FileType::Regular {
            let storage = self.storage_path(rel);
            if let Some(parent) = storage.parent() {
                fsx::create_dir_all(parent).map_err(|e| BackupError::io(e, parent))?;
            }
            fsx::copy(source_path, &storage).map_err(|e| BackupError::Copy {
                source: e,
                from: source_path.to_path_buf(),
                to: storage.clone(),
            })?;
        }
        Ok(())
    }

    /// Recreate the indexed entry `rel` at `target_path`.
    ///
    /// Any existing file or symlink at the target is removed first so a
    /// type change between backup and restore cannot make creation fail.
    /// Metadata is applied to regular files and FIFOs after creation;
    /// an apply failure is warned, not fatal.
    pub fn restore(&self, rel: &str, target_path: &Path) -> Result<(), BackupError> {
        let metadata = self
            .index
            .get(rel)
            .ok_or_else(|| BackupError::NotIndexed { path: PathBuf::from(rel) })?
            .clone();

        if let Some(parent) = target_path.parent() {
            fsx::create_dir_all(parent).map_err(|e| BackupError::io(e, parent))?;
        }
        remove_existing(target_path)?;

        match metadata.file_type {
            FileType::Regular => {
                let storage = self.storage_path(rel);
                if !storage.exists() {
                    return Err(BackupError::MissingBody { path: storage });
                }
                fsx::copy(&storage, target_path).map_err(|e| BackupError::Copy {
                    source: e,
                    from: storage,
                    to: target_path.to_path_buf(),
                })?;
            }
            FileType::Symlink => {
                if metadata.symlink_target.is_empty() {
                    return Err(BackupError::CorruptMetadata {
                        path: PathBuf::from(rel),
                        reason: "symlink entry with empty target".to_string(),
                    });
                }
                fsx::make_symlink(&metadata.symlink_target, target_path).map_err(|e| {
                    BackupError::io(e, target_path)
                })?;
            }
            FileType::Fifo => {
                fsx::create_fifo(target_path, metadata.mode).map_err(|e| {
                    BackupError::CreateSpecial { source: e, path: target_path.to_path_buf() }
                })?;
            }
            FileType::BlockDevice | FileType::CharacterDevice | FileType::Socket => {
                eprintln!(
                    "[restore] warning: recreation of special file is not implemented, skipped: {}",
                    target_path.display()
                );
                return Ok(());
            }
            FileType::Directory => return Ok(()),
        }

        if matches!(metadata.file_type, FileType::Regular | FileType::Fifo) {
            if let Err(e) = metadata.apply(target_path) {
                eprintln!(
                    "[restore] warning: cannot apply metadata to '{}': {}",
                    target_path.display(),
                    e
                );
            }
        }
        Ok(())
    }

    /// Write the index to `index.txt`, one `path\tmetadata` line per entry
    /// in insertion order.
    pub fn save_index(&self) -> Result<(), BackupError> {
        use std::io::Write;
        let mut out = String::new();
        for rel in &self.index.order {
            let meta = &self.index.map[rel];
            out.push_str(rel);
            out.push('\t');
            out.push_str(&meta.serialize());
            out.push('\n');
        }
        let mut file = fsx::File::create(&self.index_path)
            .map_err(|e| BackupError::io(e, &self.index_path))?;
        file.write_all(out.as_bytes())
            .map_err(|e| BackupError::io(e, &self.index_path))?;
        Ok(())
    }

    /// Load `index.txt` into memory, replacing the current index.
    ///
    /// The repository directories are created if absent so a restore into a
    /// freshly imported repository works without an explicit `initialize`.
    /// A missing index file leaves the index empty and succeeds; malformed
    /// lines are skipped.
    pub fn load_index(&mut self) -> Result<(), BackupError> {
        let _ = fsx::create_dir_all(&self.root);
        let _ = fsx::create_dir_all(&self.data_dir);

        self.index.clear();
        let content = match fsx::read_to_string(&self.index_path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BackupError::io(e, &self.index_path)),
        };

        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            let Some((rel, meta_str)) = line.split_once('\t') else {
                continue;
            };
            match Metadata::parse(meta_str) {
                Ok(meta) => self.index.insert(rel, meta),
                Err(_) => continue,
            }
        }
        Ok(())
    }

    /// Snapshot of the indexed relative paths, in insertion order.
    pub fn list_files(&self) -> Vec<String> {
        self.index.keys()
    }

    pub fn get_metadata(&self, rel: &str) -> Option<Metadata> {
        self.index.get(rel).cloned()
    }

    pub fn len(&self) -> usize {
        self.index.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.order.is_empty()
    }
}

/// Remove a pre-existing file or symlink at `path`; directories are left
/// alone and a missing path is fine.
fn remove_existing(path: &Path) -> Result<(), BackupError> {
    match fsx::symlink_metadata(path) {
        Ok(meta) if !meta.file_type().is_dir() => {
            fsx::remove_file(path).map_err(|e| BackupError::io(e, path))
        }
        _ => Ok(()),
    }
}

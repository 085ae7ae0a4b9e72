//! The backup driver: walks a source tree, filters candidates, captures
//! metadata and stores every supported entry into a repository.

use std::path::Path;

use crate::error::BackupError;
use crate::filter::Filter;
use crate::fsx;
use crate::metadata::Metadata;
use crate::progress::ProgressSink;
use crate::repository::{normalize_rel, Repository};

/// One backup operation over a single repository.
///
/// Per-file problems become counters and the walk keeps going; only a
/// missing source root, a failed index save, or cancellation fail the
/// operation as a whole.
pub struct Backup<'a> {
    repo: &'a mut Repository,
    backed_up: usize,
    failed: usize,
    skipped: usize,
}

impl<'a> Backup<'a> {
    pub fn new(repo: &'a mut Repository) -> Self {
        Backup { repo, backed_up: 0, failed: 0, skipped: 0 }
    }

    pub fn backed_up(&self) -> usize {
        self.backed_up
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Walk `source_root` and store everything that passes the filter.
    ///
    /// The walk never descends through symlinked directories and skips
    /// subtrees it cannot read. The index is saved once at the end; on
    /// cancellation the index is left unsaved so the on-disk state simply
    /// omits the aborted tail.
    pub fn execute(
        &mut self,
        source_root: &Path,
        filter: Option<&dyn Filter>,
        mut sink: Option<&mut dyn ProgressSink>,
    ) -> Result<(), BackupError> {
        if !source_root.exists() {
            return Err(BackupError::NotFound { path: source_root.to_path_buf() });
        }

        self.backed_up = 0;
        self.failed = 0;
        self.skipped = 0;

        let files = fsx::collect_files(source_root);
        let total = files.len();
        println!("[backup] found {} files under {}", total, source_root.display());

        if let Some(s) = sink.as_mut() {
            s.on_start(total, "backup");
        }

        for (i, path) in files.iter().enumerate() {
            let percent = if total > 0 { (i + 1) as f64 * 100.0 / total as f64 } else { 100.0 };
            if let Some(s) = sink.as_mut() {
                s.on_progress(path, i + 1, total, percent);
            }

            self.backup_file(path, source_root, filter, &mut sink);

            let cancelled = sink.as_ref().map(|s| s.should_cancel()).unwrap_or(false);
            if cancelled {
                if let Some(s) = sink.as_mut() {
                    s.on_complete(self.backed_up, self.failed, self.skipped, false);
                }
                return Err(BackupError::Cancelled);
            }
        }

        if let Err(e) = self.repo.save_index() {
            if let Some(s) = sink.as_mut() {
                s.on_complete(self.backed_up, self.failed, self.skipped, false);
            }
            return Err(e);
        }

        println!(
            "[backup] complete | stored: {} | failed: {} | skipped: {}",
            self.backed_up, self.failed, self.skipped
        );
        if let Some(s) = sink.as_mut() {
            s.on_complete(self.backed_up, self.failed, self.skipped, true);
        }
        Ok(())
    }

    fn backup_file(
        &mut self,
        path: &Path,
        source_root: &Path,
        filter: Option<&dyn Filter>,
        sink: &mut Option<&mut dyn ProgressSink>,
    ) {
        if let Some(f) = filter {
            if !f.should_include(path) {
                self.skipped += 1;
                if let Some(s) = sink.as_mut() {
                    s.on_file_skipped(path, "filtered out");
                }
                return;
            }
        }

        let file_type = match fsx::classify(path) {
            Ok(t) => t,
            Err(e) => {
                self.failed += 1;
                if let Some(s) = sink.as_mut() {
                    s.on_file_error(path, &e.to_string());
                }
                return;
            }
        };
        if !fsx::is_backup_supported(file_type) {
            self.skipped += 1;
            if let Some(s) = sink.as_mut() {
                s.on_file_skipped(path, "unsupported file type");
            }
            return;
        }

        let metadata = match Metadata::load(path) {
            Ok(m) => m,
            Err(e) => {
                self.failed += 1;
                if let Some(s) = sink.as_mut() {
                    s.on_file_error(path, &e.to_string());
                }
                return;
            }
        };

        let rel = normalize_rel(path.strip_prefix(source_root).unwrap_or(path));
        match self.repo.store(path, &rel, &metadata) {
            Ok(()) => {
                self.backed_up += 1;
                if let Some(s) = sink.as_mut() {
                    s.on_file_success(path);
                }
            }
            Err(e) => {
                self.failed += 1;
                eprintln!("[backup] cannot store '{}': {}", path.display(), e);
                if let Some(s) = sink.as_mut() {
                    s.on_file_error(path, &e.to_string());
                }
            }
        }
    }
}

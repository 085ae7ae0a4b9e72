//! Composable predicates that narrow the set of files a backup captures.
//!
//! Every filter is a pure predicate over a candidate path; filters may stat
//! the path but never mutate anything. A [`FilterChain`] is the conjunction
//! of its members, and an empty chain accepts every path.

use std::path::Path;

use crate::fsx::{self, FileType};

/// Decides whether a path should be included in a backup.
pub trait Filter {
    fn should_include(&self, path: &Path) -> bool;
}

/// Include/exclude lists of string patterns matched against the path text.
///
/// A pattern matches when it equals the path, when it occurs as a substring
/// of the path, or — for patterns with a trailing `/` — when the path starts
/// with the pattern minus that slash. Excludes win over includes; with no
/// include patterns everything not excluded is accepted.
#[derive(Debug, Default, Clone)]
pub struct PathFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl PathFilter {
    pub fn new() -> Self {
        PathFilter::default()
    }

    pub fn add_include(&mut self, pattern: impl Into<String>) {
        self.include.push(pattern.into());
    }

    pub fn add_exclude(&mut self, pattern: impl Into<String>) {
        self.exclude.push(pattern.into());
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn matches(path_str: &str, pattern: &str) -> bool {
        if let Some(dir) = pattern.strip_suffix('/') {
            path_str.starts_with(dir) || path_str.contains(pattern)
        } else {
            path_str == pattern || path_str.contains(pattern)
        }
    }
}

impl Filter for PathFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.is_empty() {
            return true;
        }
        let path_str = path.to_string_lossy();

        for pattern in &self.exclude {
            if Self::matches(&path_str, pattern) {
                return false;
            }
        }
        if !self.include.is_empty() {
            return self.include.iter().any(|p| Self::matches(&path_str, p));
        }
        true
    }
}

/// Accepts paths whose filename contains any of the keywords.
#[derive(Debug, Default, Clone)]
pub struct NameFilter {
    keywords: Vec<String>,
}

impl NameFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        NameFilter { keywords }
    }
}

impl Filter for NameFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => return false,
        };
        self.keywords.iter().any(|kw| name.contains(kw.as_str()))
    }
}

/// Accepts paths whose lstat type is in the allowed set; empty set allows all.
#[derive(Debug, Default, Clone)]
pub struct FileTypeFilter {
    allowed: Vec<FileType>,
}

impl FileTypeFilter {
    pub fn new(allowed: Vec<FileType>) -> Self {
        FileTypeFilter { allowed }
    }

    pub fn add_allowed(&mut self, ft: FileType) {
        if !self.allowed.contains(&ft) {
            self.allowed.push(ft);
        }
    }
}

impl Filter for FileTypeFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        // An unclassifiable path counts as a regular file.
        let ft = fsx::classify(path).unwrap_or(FileType::Regular);
        self.allowed.contains(&ft)
    }
}

/// Inclusive mtime window. A failed stat accepts.
#[derive(Debug, Default, Clone)]
pub struct TimeFilter {
    pub after: Option<i64>,
    pub before: Option<i64>,
}

impl TimeFilter {
    pub fn new(after: Option<i64>, before: Option<i64>) -> Self {
        TimeFilter { after, before }
    }
}

impl Filter for TimeFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.after.is_none() && self.before.is_none() {
            return true;
        }
        let meta = match fsx::metadata(path) {
            Ok(m) => m,
            Err(_) => return true,
        };
        let (_, mtime, _, _) = fsx::stat_fields(&meta);
        if let Some(after) = self.after {
            if mtime < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if mtime > before {
                return false;
            }
        }
        true
    }
}

/// Inclusive byte-size window, applied to regular files only.
///
/// Symlinks and special files have no meaningful size and pass through, as
/// does any path whose size cannot be fetched.
#[derive(Debug, Default, Clone)]
pub struct SizeFilter {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl SizeFilter {
    pub fn new(min: Option<u64>, max: Option<u64>) -> Self {
        SizeFilter { min, max }
    }
}

impl Filter for SizeFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.min.is_none() && self.max.is_none() {
            return true;
        }
        let meta = match fsx::symlink_metadata(path) {
            Ok(m) => m,
            Err(_) => return true,
        };
        if meta.file_type().is_symlink() || !meta.file_type().is_file() {
            return true;
        }
        let size = meta.len();
        if let Some(min) = self.min {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if size > max {
                return false;
            }
        }
        true
    }
}

/// Accepts paths owned by the given uid and/or gid. A failed stat accepts.
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl UserFilter {
    pub fn new(uid: Option<u32>, gid: Option<u32>) -> Self {
        UserFilter { uid, gid }
    }
}

impl Filter for UserFilter {
    fn should_include(&self, path: &Path) -> bool {
        if self.uid.is_none() && self.gid.is_none() {
            return true;
        }
        let meta = match fsx::metadata(path) {
            Ok(m) => m,
            Err(_) => return true,
        };
        let (_, _, uid, gid) = fsx::stat_fields(&meta);
        if let Some(want) = self.uid {
            if uid != want {
                return false;
            }
        }
        if let Some(want) = self.gid {
            if gid != want {
                return false;
            }
        }
        true
    }
}

/// Conjunction of filters; a path passes only if every member accepts it.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        FilterChain { filters: Vec::new() }
    }

    pub fn add(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for FilterChain {
    fn should_include(&self, path: &Path) -> bool {
        self.filters.iter().all(|f| f.should_include(path))
    }
}

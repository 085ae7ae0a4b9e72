//! Per-file metadata: capture from the filesystem, apply back to restored
//! files, and the textual serialisation used by the repository index.

use std::io;
use std::path::Path;

use crate::error::BackupError;
use crate::fsx::{self, FileType};

/// Everything the repository remembers about one path.
///
/// `mode` holds the full `st_mode` word as reported by lstat, type bits
/// included; `uid`/`gid` are captured but never applied. The device numbers
/// are reserved for future device-file recreation and stay zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub mode: u32,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub file_type: FileType,
    pub is_symlink: bool,
    pub symlink_target: String,
    pub dev_major: u32,
    pub dev_minor: u32,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            mode: 0,
            mtime: 0,
            uid: 0,
            gid: 0,
            file_type: FileType::Regular,
            is_symlink: false,
            symlink_target: String::new(),
            dev_major: 0,
            dev_minor: 0,
        }
    }
}

impl Metadata {
    /// Capture metadata from `path` without following symlinks.
    pub fn load(path: &Path) -> Result<Metadata, BackupError> {
        let meta = fsx::symlink_metadata(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BackupError::NotFound { path: path.to_path_buf() }
            } else {
                BackupError::Stat { source: e, path: path.to_path_buf() }
            }
        })?;

        let file_type = fsx::type_of(&meta.file_type());
        let (mode, mtime, uid, gid) = fsx::stat_fields(&meta);

        let is_symlink = file_type == FileType::Symlink;
        let symlink_target = if is_symlink {
            fsx::read_link(path)
                .map_err(|e| BackupError::ReadLink { source: e, path: path.to_path_buf() })?
                .to_string_lossy()
                .into_owned()
        } else {
            String::new()
        };

        Ok(Metadata {
            mode,
            mtime,
            uid,
            gid,
            file_type,
            is_symlink,
            symlink_target,
            dev_major: 0,
            dev_minor: 0,
        })
    }

    /// Apply mode and timestamps to `path`.
    ///
    /// Mode application is best-effort: a chmod failure is warned and does
    /// not fail the call. Timestamps are set to second precision on both
    /// atime and mtime, without dereferencing symlinks where the platform
    /// allows it. uid/gid are never applied.
    pub fn apply(&self, path: &Path) -> Result<(), BackupError> {
        if !self.is_symlink {
            if let Err(e) = fsx::set_unix_permissions(path, self.mode) {
                eprintln!("[sepack] warning: cannot set mode on '{}': {}", path.display(), e);
            }
        }
        fsx::set_file_times_nofollow(path, self.mtime)
            .map_err(|e| BackupError::io(e, path))?;
        Ok(())
    }

    /// Textual form: `mode:mtime:uid:gid:is_symlink:symlink_target`.
    ///
    /// The target is the remainder of the line and may itself contain
    /// colons, or be empty for non-symlinks.
    pub fn serialize(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.mode,
            self.mtime,
            self.uid,
            self.gid,
            if self.is_symlink { 1 } else { 0 },
            self.symlink_target
        )
    }

    /// Parse the textual form produced by [`serialize`](Self::serialize).
    ///
    /// The file type is recovered from the `S_IFMT` bits of the stored mode;
    /// `is_symlink == 1` forces `Symlink`, and a mode without type bits
    /// defaults to `Regular`.
    pub fn parse(s: &str) -> Result<Metadata, BackupError> {
        let fields: Vec<&str> = s.splitn(6, ':').collect();
        if fields.len() != 6 {
            return Err(BackupError::MalformedMetadata {
                reason: format!("expected 6 fields, got {}", fields.len()),
            });
        }

        let mode: u32 = fields[0].parse().map_err(|_| BackupError::MalformedMetadata {
            reason: format!("bad mode '{}'", fields[0]),
        })?;
        let mtime: i64 = fields[1].parse().map_err(|_| BackupError::MalformedMetadata {
            reason: format!("bad mtime '{}'", fields[1]),
        })?;
        let uid: u32 = fields[2].parse().map_err(|_| BackupError::MalformedMetadata {
            reason: format!("bad uid '{}'", fields[2]),
        })?;
        let gid: u32 = fields[3].parse().map_err(|_| BackupError::MalformedMetadata {
            reason: format!("bad gid '{}'", fields[3]),
        })?;
        let is_symlink = match fields[4] {
            "0" => false,
            "1" => true,
            other => {
                return Err(BackupError::MalformedMetadata {
                    reason: format!("bad is_symlink flag '{}'", other),
                })
            }
        };

        let file_type = if is_symlink {
            FileType::Symlink
        } else {
            fsx::file_type_from_mode(mode).unwrap_or(FileType::Regular)
        };

        Ok(Metadata {
            mode,
            mtime,
            uid,
            gid,
            file_type,
            is_symlink,
            symlink_target: fields[5].to_string(),
            dev_major: 0,
            dev_minor: 0,
        })
    }
}

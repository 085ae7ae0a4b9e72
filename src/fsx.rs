//! Cross-platform filesystem shim used throughout sepack.
//!
//! A thin wrapper around `std::fs` plus the handful of POSIX operations the
//! standard library does not expose (FIFO creation, no-follow timestamp
//! application). The rest of the codebase can `use crate::fsx as fs;` and
//! stay platform-agnostic.
//!
//! * On **all** platforms every symbol from `std::fs` is re-exported, so
//!   things like `fs::File` or `fs::copy` work out of the box.
//! * On Unix the helpers below forward to the real syscalls.
//! * On non-Unix targets the mode/timestamp helpers degrade to no-ops and
//!   the special-file helpers report `Unsupported`, keeping the on-disk
//!   formats identical across platforms.

use std::io;
use std::path::Path;

use crate::error::BackupError;

// Re-export the whole standard fs module so callers can write `fs::File` etc.
pub use std::fs::*;

/// File type of one directory entry, as reported by lstat.
///
/// The backup-supported subset is `Regular`, `Directory`, `Symlink` and
/// `Fifo`; the remaining variants are captured as metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Fifo,
    BlockDevice,
    CharacterDevice,
    Socket,
}

/// Classify a path without following symlinks.
///
/// A missing path is `NotFound`; any other stat failure is `Stat`.
pub fn classify(path: &Path) -> Result<FileType, BackupError> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            BackupError::NotFound { path: path.to_path_buf() }
        } else {
            BackupError::Stat { source: e, path: path.to_path_buf() }
        }
    })?;
    Ok(type_of(&meta.file_type()))
}

/// Map a `std::fs::FileType` (from lstat) onto our variant set.
pub fn type_of(ft: &std::fs::FileType) -> FileType {
    if ft.is_symlink() {
        return FileType::Symlink;
    }
    if ft.is_dir() {
        return FileType::Directory;
    }
    if ft.is_file() {
        return FileType::Regular;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_fifo() {
            return FileType::Fifo;
        }
        if ft.is_block_device() {
            return FileType::BlockDevice;
        }
        if ft.is_char_device() {
            return FileType::CharacterDevice;
        }
        if ft.is_socket() {
            return FileType::Socket;
        }
    }
    FileType::Regular
}

/// Whether entries of this type get captured by a backup.
pub fn is_backup_supported(ft: FileType) -> bool {
    matches!(
        ft,
        FileType::Regular | FileType::Directory | FileType::Symlink | FileType::Fifo
    )
}

/// Recover a file type from the `S_IFMT` bits of a stored mode.
///
/// Returns `None` when the mode carries no (or unknown) type bits, e.g. a
/// plain `0o644` permission value.
pub fn file_type_from_mode(mode: u32) -> Option<FileType> {
    match mode & 0o170000 {
        0o100000 => Some(FileType::Regular),
        0o040000 => Some(FileType::Directory),
        0o120000 => Some(FileType::Symlink),
        0o010000 => Some(FileType::Fifo),
        0o060000 => Some(FileType::BlockDevice),
        0o020000 => Some(FileType::CharacterDevice),
        0o140000 => Some(FileType::Socket),
        _ => None,
    }
}

/// Collect every non-directory entry under `root`, in walk order.
///
/// Symlinked directories are reported as entries but never descended into,
/// so link loops cannot hang the walk. Entries that cannot be read
/// (permission denied and the like) are skipped.
pub fn collect_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_dir() {
            files.push(entry.path().to_path_buf());
        }
    }
    files
}

// --------------------------------------------------------------------------
// Unix-specific helpers
// --------------------------------------------------------------------------

#[cfg(unix)]
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

/// mode/mtime/uid/gid as reported by an already-fetched lstat.
#[cfg(unix)]
pub fn stat_fields(meta: &std::fs::Metadata) -> (u32, i64, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.mode(), meta.mtime(), meta.uid(), meta.gid())
}

#[cfg(unix)]
fn to_cstring(path: &Path) -> io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))
}

/// Set atime and mtime to `mtime` seconds, without dereferencing symlinks.
///
/// Tries nanosecond-precision `utimensat` with `AT_SYMLINK_NOFOLLOW` first,
/// then falls back to microsecond-precision `utimes`.
#[cfg(unix)]
pub fn set_file_times_nofollow(path: &Path, mtime: i64) -> io::Result<()> {
    let cpath = to_cstring(path)?;
    let ts = libc::timespec { tv_sec: mtime as libc::time_t, tv_nsec: 0 };
    let times = [ts, ts];
    let rc = unsafe {
        libc::utimensat(libc::AT_FDCWD, cpath.as_ptr(), times.as_ptr(), libc::AT_SYMLINK_NOFOLLOW)
    };
    if rc == 0 {
        return Ok(());
    }
    let tv = libc::timeval { tv_sec: mtime as libc::time_t, tv_usec: 0 };
    let tvs = [tv, tv];
    let rc = unsafe { libc::utimes(cpath.as_ptr(), tvs.as_ptr()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Create a FIFO with the permission bits of `mode`.
#[cfg(unix)]
pub fn create_fifo(path: &Path, mode: u32) -> io::Result<()> {
    let cpath = to_cstring(path)?;
    let rc = unsafe { libc::mkfifo(cpath.as_ptr(), (mode & 0o7777) as libc::mode_t) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
pub fn make_symlink(target: &str, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

// --------------------------------------------------------------------------
// Non-Unix stubs (Windows, wasm, etc.)
// --------------------------------------------------------------------------

#[cfg(not(unix))]
#[inline]
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub fn stat_fields(meta: &std::fs::Metadata) -> (u32, i64, u32, u32) {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    (0, mtime, 0, 0)
}

#[cfg(not(unix))]
#[inline]
pub fn set_file_times_nofollow(_path: &Path, _mtime: i64) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub fn create_fifo(path: &Path, _mode: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("FIFO creation is not supported on this platform: {}", path.display()),
    ))
}

#[cfg(not(unix))]
pub fn make_symlink(_target: &str, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("symlink creation is not supported on this platform: {}", link.display()),
    ))
}

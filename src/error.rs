use std::io;
use std::path::PathBuf;

/// The primary error type for all operations in the `sepack` crate.
#[derive(Debug)]
pub enum BackupError {
    /// The requested path does not exist.
    NotFound { path: PathBuf },

    /// Reading filesystem status (lstat/stat) failed.
    Stat { source: io::Error, path: PathBuf },

    /// Reading a symlink's target failed.
    ReadLink { source: io::Error, path: PathBuf },

    /// Copying a file body failed.
    Copy { source: io::Error, from: PathBuf, to: PathBuf },

    /// Creating a special file (FIFO) failed.
    CreateSpecial { source: io::Error, path: PathBuf },

    /// The relative path has no entry in the repository index.
    NotIndexed { path: PathBuf },

    /// The index lists a regular file but its body is missing from `data/`.
    MissingBody { path: PathBuf },

    /// Indexed metadata is inconsistent (e.g. a symlink with an empty target).
    CorruptMetadata { path: PathBuf, reason: String },

    /// A serialized metadata string could not be parsed.
    MalformedMetadata { reason: String },

    /// A read hit end-of-stream before the expected number of bytes.
    UnexpectedEof,

    /// A compressed or packed byte stream violates its own framing rules.
    CorruptStream(String),

    /// A package (or TOC) magic signature did not match.
    MagicMismatch,

    /// An encrypted package operation was requested without a password.
    EncryptionRequiresPassword,

    /// The operation was cancelled through the progress sink.
    Cancelled,

    /// An I/O error that doesn't fit a more specific variant.
    /// Includes the path where the error happened, when known.
    Io { source: io::Error, path: PathBuf },
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::NotFound { path } => write!(f, "path not found: {}", path.display()),
            BackupError::Stat { source, path } => {
                write!(f, "cannot stat '{}': {}", path.display(), source)
            }
            BackupError::ReadLink { source, path } => {
                write!(f, "cannot read symlink '{}': {}", path.display(), source)
            }
            BackupError::Copy { source, from, to } => write!(
                f,
                "copy failed '{}' -> '{}': {}",
                from.display(),
                to.display(),
                source
            ),
            BackupError::CreateSpecial { source, path } => {
                write!(f, "cannot create special file '{}': {}", path.display(), source)
            }
            BackupError::NotIndexed { path } => {
                write!(f, "not in repository index: {}", path.display())
            }
            BackupError::MissingBody { path } => {
                write!(f, "indexed file has no body in repository: {}", path.display())
            }
            BackupError::CorruptMetadata { path, reason } => {
                write!(f, "corrupt metadata for '{}': {}", path.display(), reason)
            }
            BackupError::MalformedMetadata { reason } => {
                write!(f, "malformed metadata: {}", reason)
            }
            BackupError::UnexpectedEof => write!(f, "unexpected end of stream"),
            BackupError::CorruptStream(msg) => write!(f, "corrupt stream: {}", msg),
            BackupError::MagicMismatch => write!(f, "magic signature mismatch"),
            BackupError::EncryptionRequiresPassword => {
                write!(f, "encryption selected but no password given")
            }
            BackupError::Cancelled => write!(f, "operation cancelled"),
            BackupError::Io { source, path } => {
                if path.as_os_str().is_empty() {
                    write!(f, "I/O error: {}", source)
                } else {
                    write!(f, "I/O error on path '{}': {}", path.display(), source)
                }
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Stat { source, .. }
            | BackupError::ReadLink { source, .. }
            | BackupError::Copy { source, .. }
            | BackupError::CreateSpecial { source, .. }
            | BackupError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::Io { source: err, path: PathBuf::new() }
    }
}

impl BackupError {
    /// Attach a path to a bare I/O error.
    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        BackupError::Io { source, path: path.into() }
    }
}

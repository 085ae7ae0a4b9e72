use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::fsx::FileType;
use crate::package::{Compression, Encryption, PackLayout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Back up a directory tree into a repository.
    #[command(alias = "b")]
    Backup {
        /// The directory to back up.
        source: PathBuf,

        /// The repository directory to store into.
        repo: PathBuf,

        /// Include only paths matching this pattern (repeatable).
        #[arg(long = "include")]
        include: Vec<String>,

        /// Exclude paths matching this pattern (repeatable).
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Restrict to these file types (repeatable).
        #[arg(long = "type", value_enum)]
        types: Vec<TypeArg>,

        /// Keep only files whose name contains this keyword (repeatable).
        #[arg(long = "name-contains")]
        name_contains: Vec<String>,

        /// Keep only files modified at or after this Unix timestamp.
        #[arg(long = "mtime-after")]
        mtime_after: Option<i64>,

        /// Keep only files modified at or before this Unix timestamp.
        #[arg(long = "mtime-before")]
        mtime_before: Option<i64>,

        /// Keep only regular files of at least this many bytes.
        #[arg(long = "min-size")]
        min_size: Option<u64>,

        /// Keep only regular files of at most this many bytes.
        #[arg(long = "max-size")]
        max_size: Option<u64>,

        /// Keep only files owned by this user id.
        #[arg(long)]
        uid: Option<u32>,

        /// Keep only files owned by this group id.
        #[arg(long)]
        gid: Option<u32>,

        /// Show a progress bar while backing up.
        #[arg(long)]
        progress: bool,
    },

    /// Restore a repository into a target directory.
    #[command(alias = "r")]
    Restore {
        /// The repository directory to restore from.
        repo: PathBuf,

        /// The directory to restore into.
        target: PathBuf,

        /// Show a progress bar while restoring.
        #[arg(long)]
        progress: bool,
    },

    /// List the entries recorded in a repository index.
    #[command(alias = "l")]
    List {
        /// The repository directory to list.
        repo: PathBuf,
    },

    /// Pack a repository directory into a single package file.
    Export {
        /// The repository directory to pack.
        repo: PathBuf,

        /// The package file to create (e.g. backup.sepkg).
        package: PathBuf,

        /// Body layout of the package.
        #[arg(long, value_enum, default_value_t = PackArg::Header)]
        pack: PackArg,

        /// Compression applied to each entry.
        #[arg(long, value_enum, default_value_t = CompressArg::None)]
        compress: CompressArg,

        /// Encryption applied to each entry.
        #[arg(long, value_enum, default_value_t = EncryptArg::None)]
        encrypt: EncryptArg,

        /// Password for encryption. Falls back to SEPACK_PASSWORD.
        #[arg(long)]
        password: Option<String>,
    },

    /// Rebuild a repository directory from a package file.
    Import {
        /// The package file to read.
        package: PathBuf,

        /// The repository directory to rebuild.
        repo: PathBuf,

        /// Password for decryption. Falls back to SEPACK_PASSWORD.
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackArg {
    /// One inline header per entry; read sequentially.
    Header,
    /// Trailing table of contents; random access.
    Toc,
}

impl From<PackArg> for PackLayout {
    fn from(v: PackArg) -> Self {
        match v {
            PackArg::Header => PackLayout::HeaderPerFile,
            PackArg::Toc => PackLayout::TocAtEnd,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompressArg {
    None,
    Rle,
}

impl From<CompressArg> for Compression {
    fn from(v: CompressArg) -> Self {
        match v {
            CompressArg::None => Compression::None,
            CompressArg::Rle => Compression::Rle,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncryptArg {
    None,
    Xor,
    Rc4,
}

impl From<EncryptArg> for Encryption {
    fn from(v: EncryptArg) -> Self {
        match v {
            EncryptArg::None => Encryption::None,
            EncryptArg::Xor => Encryption::Xor,
            EncryptArg::Rc4 => Encryption::Rc4,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeArg {
    Regular,
    Directory,
    Symlink,
    Fifo,
    Block,
    Char,
    Socket,
}

impl From<TypeArg> for FileType {
    fn from(v: TypeArg) -> Self {
        match v {
            TypeArg::Regular => FileType::Regular,
            TypeArg::Directory => FileType::Directory,
            TypeArg::Symlink => FileType::Symlink,
            TypeArg::Fifo => FileType::Fifo,
            TypeArg::Block => FileType::BlockDevice,
            TypeArg::Char => FileType::CharacterDevice,
            TypeArg::Socket => FileType::Socket,
        }
    }
}

/// Gets the password from the command-line option or the `SEPACK_PASSWORD`
/// environment variable.
pub fn get_password_from_opt_or_env(password_opt: Option<String>) -> Option<String> {
    if password_opt.is_some() {
        return password_opt;
    }
    std::env::var("SEPACK_PASSWORD").ok()
}

/// Parses command-line arguments and returns the command to execute.
///
/// Argument errors and `--help` are handled by clap, which prints and
/// exits on its own.
pub fn run() -> Commands {
    Args::parse().command
}

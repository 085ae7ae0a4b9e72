//! # The sepack package container
//!
//! A repository directory can be serialised into one self-describing
//! `.sepkg` file and rebuilt from it. The container starts with a fixed
//! header:
//!
//! ```text
//! offset  size  field
//!  0       6    magic = "SEXP01"
//!  6       1    version = 1
//!  7       1    body layout   (1 = header-per-file, 2 = TOC at end)
//!  8       1    compression   (0 = none, 1 = RLE)
//!  9       1    encryption    (0 = none, 1 = XOR, 2 = RC4)
//! 10       4    salt length (u32 LE; 0 or 16)
//! 14       N    salt bytes
//! ```
//!
//! followed by one of two body layouts (see [`layout`]). Every entry's
//! bytes are compressed first and encrypted second; import reverses the
//! pipeline. The salt is drawn fresh per package whenever encryption is on.

pub mod cipher;
pub mod io;
mod layout;
pub mod rle;

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};

use crate::error::BackupError;
use crate::fsx;
use crate::repository::normalize_rel;

use io::{read_u32, read_u8, read_vec, write_bytes, write_u32, write_u8};

pub const MAGIC: &[u8; 6] = b"SEXP01";
pub const VERSION: u8 = 1;

/// How entries are framed inside the package body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackLayout {
    /// Each entry carries its own inline header; sequential access.
    HeaderPerFile = 1,
    /// Payloads first, table of contents at the end; random access.
    TocAtEnd = 2,
}

impl PackLayout {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(PackLayout::HeaderPerFile),
            2 => Some(PackLayout::TocAtEnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None = 0,
    Rle = 1,
}

impl Compression {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Compression::None),
            1 => Some(Compression::Rle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None = 0,
    Xor = 1,
    Rc4 = 2,
}

impl Encryption {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Encryption::None),
            1 => Some(Encryption::Xor),
            2 => Some(Encryption::Rc4),
            _ => None,
        }
    }
}

/// Export-time choices for one package.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub layout: PackLayout,
    pub compression: Compression,
    pub encryption: Encryption,
    pub password: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        PackageOptions {
            layout: PackLayout::HeaderPerFile,
            compression: Compression::None,
            encryption: Encryption::None,
            password: String::new(),
        }
    }
}

/// One packaged file: its `/`-separated relative path, its size before the
/// compress/encrypt pipeline, and the pipelined payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub rel_path: String,
    pub original_size: u64,
    pub payload: Vec<u8>,
}

fn apply_compress(data: Vec<u8>, c: Compression) -> Vec<u8> {
    match c {
        Compression::None => data,
        Compression::Rle => rle::compress(&data),
    }
}

fn apply_decompress(data: Vec<u8>, c: Compression) -> Result<Vec<u8>, BackupError> {
    match c {
        Compression::None => Ok(data),
        Compression::Rle => rle::decompress(&data),
    }
}

// XOR and RC4 are involutions, so the same function serves both directions.
fn apply_crypt(data: Vec<u8>, e: Encryption, password: &str, salt: &[u8]) -> Vec<u8> {
    match e {
        Encryption::None => data,
        Encryption::Xor => cipher::xor_crypt(&data, password, salt),
        Encryption::Rc4 => cipher::rc4_crypt(&data, password, salt),
    }
}

/// Serialise `repo_dir` into a single package file.
///
/// Every regular file under the repository is read whole, compressed, then
/// encrypted, and framed in the chosen body layout. If the output file
/// happens to live inside the repository it is skipped rather than packaged
/// into itself.
pub fn export_package(
    repo_dir: &Path,
    package_file: &Path,
    opts: &PackageOptions,
) -> Result<(), BackupError> {
    if !repo_dir.exists() {
        return Err(BackupError::NotFound { path: repo_dir.to_path_buf() });
    }
    if opts.encryption != Encryption::None && opts.password.is_empty() {
        return Err(BackupError::EncryptionRequiresPassword);
    }

    let salt = if opts.encryption == Encryption::None { Vec::new() } else { cipher::generate_salt() };

    // The package may already exist from a previous run; resolve it once so
    // the walk below can recognise and skip it.
    let package_canon = package_file.canonicalize().ok();

    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(repo_dir) {
        let entry = entry.map_err(|e| BackupError::io(e.into(), repo_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let abs = entry.path();
        if let (Some(pkg), Ok(this)) = (&package_canon, abs.canonicalize()) {
            if &this == pkg {
                continue;
            }
        }

        let raw = fsx::read(abs).map_err(|e| BackupError::io(e, abs))?;
        let rel_path = normalize_rel(abs.strip_prefix(repo_dir).unwrap_or(abs));
        let original_size = raw.len() as u64;

        let packed = apply_compress(raw, opts.compression);
        let payload = apply_crypt(packed, opts.encryption, &opts.password, &salt);
        entries.push(Entry { rel_path, original_size, payload });
    }

    let file = fsx::File::create(package_file).map_err(|e| BackupError::io(e, package_file))?;
    let mut w = BufWriter::new(file);

    write_bytes(&mut w, MAGIC)?;
    write_u8(&mut w, VERSION)?;
    write_u8(&mut w, opts.layout.tag())?;
    write_u8(&mut w, opts.compression.tag())?;
    write_u8(&mut w, opts.encryption.tag())?;
    write_u32(&mut w, salt.len() as u32)?;
    write_bytes(&mut w, &salt)?;

    let body_start = 14 + salt.len() as u64;
    match opts.layout {
        PackLayout::HeaderPerFile => layout::write_header_per_file(&mut w, &entries)?,
        PackLayout::TocAtEnd => layout::write_toc(&mut w, &entries, body_start)?,
    }
    w.flush().map_err(|e| BackupError::io(e, package_file))?;

    println!(
        "[package] exported {} entries from {} to {}",
        entries.len(),
        repo_dir.display(),
        package_file.display()
    );
    Ok(())
}

/// Rebuild a repository directory from a package file.
///
/// The resulting directory is shape-equivalent to the one that was exported
/// and is directly usable by the restore driver.
pub fn import_package(
    package_file: &Path,
    repo_dir: &Path,
    password: &str,
) -> Result<(), BackupError> {
    let file = fsx::File::open(package_file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BackupError::NotFound { path: package_file.to_path_buf() }
        } else {
            BackupError::io(e, package_file)
        }
    })?;
    let mut r = BufReader::new(file);

    let magic = read_vec(&mut r, 6)?;
    if magic != MAGIC {
        return Err(BackupError::MagicMismatch);
    }
    let _version = read_u8(&mut r)?;
    let layout_tag = read_u8(&mut r)?;
    let compression = Compression::from_tag(read_u8(&mut r)?)
        .ok_or_else(|| BackupError::CorruptStream("unknown compression tag".to_string()))?;
    let encryption = Encryption::from_tag(read_u8(&mut r)?)
        .ok_or_else(|| BackupError::CorruptStream("unknown encryption tag".to_string()))?;
    let pack_layout = PackLayout::from_tag(layout_tag)
        .ok_or_else(|| BackupError::CorruptStream("unknown body layout tag".to_string()))?;

    let salt_len = read_u32(&mut r)?;
    let salt = read_vec(&mut r, salt_len as usize)?;

    if encryption != Encryption::None && password.is_empty() {
        return Err(BackupError::EncryptionRequiresPassword);
    }

    fsx::create_dir_all(repo_dir).map_err(|e| BackupError::io(e, repo_dir))?;

    let entries = match pack_layout {
        PackLayout::HeaderPerFile => layout::read_header_per_file(&mut r)?,
        PackLayout::TocAtEnd => layout::read_toc(r.get_mut())?,
    };

    let mut written = 0usize;
    for entry in entries {
        if Path::new(&entry.rel_path).components().any(|c| matches!(c, Component::ParentDir)) {
            eprintln!("[package] warning: skipping entry with '..' in path: {}", entry.rel_path);
            continue;
        }

        let decrypted = apply_crypt(entry.payload, encryption, password, &salt);
        let raw = apply_decompress(decrypted, compression)?;

        let out_path = repo_dir.join(Path::new(&entry.rel_path));
        if let Some(parent) = out_path.parent() {
            fsx::create_dir_all(parent).map_err(|e| BackupError::io(e, parent))?;
        }
        fsx::write(&out_path, &raw).map_err(|e| BackupError::io(e, &out_path))?;
        written += 1;
    }

    println!(
        "[package] imported {} entries from {} into {}",
        written,
        package_file.display(),
        repo_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo(root: &Path) {
        fsx::create_dir_all(root.join("data/a")).unwrap();
        fsx::write(root.join("index.txt"), b"a/b.txt\t420:1700000000:0:0:0:\n").unwrap();
        fsx::write(root.join("data/a/b.txt"), b"hello").unwrap();
    }

    fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
        let mut out: Vec<(String, Vec<u8>)> = fsx::collect_files(root)
            .into_iter()
            .map(|p| {
                let rel = normalize_rel(p.strip_prefix(root).unwrap());
                (rel, fsx::read(&p).unwrap())
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn tag_mapping_is_stable() {
        assert_eq!(PackLayout::HeaderPerFile.tag(), 1);
        assert_eq!(PackLayout::TocAtEnd.tag(), 2);
        assert_eq!(Compression::Rle.tag(), 1);
        assert_eq!(Encryption::Rc4.tag(), 2);
        assert_eq!(PackLayout::from_tag(3), None);
        assert_eq!(Compression::from_tag(9), None);
        assert_eq!(Encryption::from_tag(9), None);
    }

    #[test]
    fn header_bytes_for_rle_unencrypted_package() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        fsx::create_dir_all(&repo).unwrap();
        fsx::write(repo.join("index.txt"), b"aaaaab").unwrap();

        let pkg = dir.path().join("repo.sepkg");
        let opts = PackageOptions {
            layout: PackLayout::HeaderPerFile,
            compression: Compression::Rle,
            ..Default::default()
        };
        export_package(&repo, &pkg, &opts).unwrap();

        let bytes = fsx::read(&pkg).unwrap();
        assert_eq!(
            &bytes[..14],
            &[0x53, 0x45, 0x58, 0x50, 0x30, 0x31, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        // One entry: count, "index.txt", original size 6, stored size 4, payload.
        assert_eq!(&bytes[14..18], &[1, 0, 0, 0]);
        assert_eq!(&bytes[18..22], &[9, 0, 0, 0]);
        assert_eq!(&bytes[22..31], b"index.txt");
        assert_eq!(&bytes[bytes.len() - 4..], &[0x05, 0x61, 0x01, 0x62]);
    }

    #[test]
    fn export_import_roundtrip_all_option_combinations() {
        let layouts = [PackLayout::HeaderPerFile, PackLayout::TocAtEnd];
        let compressions = [Compression::None, Compression::Rle];
        let encryptions = [Encryption::None, Encryption::Xor, Encryption::Rc4];

        for layout in layouts {
            for compression in compressions {
                for encryption in encryptions {
                    let dir = tempfile::tempdir().unwrap();
                    let repo = dir.path().join("repo");
                    make_repo(&repo);

                    let password = if encryption == Encryption::None { "" } else { "pw" };
                    let opts = PackageOptions {
                        layout,
                        compression,
                        encryption,
                        password: password.to_string(),
                    };
                    let pkg = dir.path().join("out.sepkg");
                    export_package(&repo, &pkg, &opts).unwrap();

                    let rebuilt = dir.path().join("rebuilt");
                    import_package(&pkg, &rebuilt, password).unwrap();
                    assert_eq!(read_tree(&repo), read_tree(&rebuilt));
                }
            }
        }
    }

    #[test]
    fn encryption_without_password_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        make_repo(&repo);

        let opts = PackageOptions { encryption: Encryption::Xor, ..Default::default() };
        let err = export_package(&repo, &dir.path().join("p.sepkg"), &opts);
        assert!(matches!(err, Err(BackupError::EncryptionRequiresPassword)));
    }

    #[test]
    fn import_of_encrypted_package_requires_password() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        make_repo(&repo);

        let opts = PackageOptions {
            encryption: Encryption::Rc4,
            password: "pw".to_string(),
            ..Default::default()
        };
        let pkg = dir.path().join("p.sepkg");
        export_package(&repo, &pkg, &opts).unwrap();

        let err = import_package(&pkg, &dir.path().join("rebuilt"), "");
        assert!(matches!(err, Err(BackupError::EncryptionRequiresPassword)));
    }

    #[test]
    fn wrong_password_with_rle_surfaces_as_corrupt_stream_or_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        make_repo(&repo);

        let opts = PackageOptions {
            compression: Compression::Rle,
            encryption: Encryption::Rc4,
            password: "right".to_string(),
            ..Default::default()
        };
        let pkg = dir.path().join("p.sepkg");
        export_package(&repo, &pkg, &opts).unwrap();

        // Detection is not guaranteed; either the RLE framing breaks or the
        // rebuilt bytes differ from the source.
        let rebuilt = dir.path().join("rebuilt");
        match import_package(&pkg, &rebuilt, "wrong") {
            Err(BackupError::CorruptStream(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(()) => assert_ne!(read_tree(&repo), read_tree(&rebuilt)),
        }
    }

    #[test]
    fn import_rejects_non_package_files() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.sepkg");
        fsx::write(&bogus, b"definitely not a package").unwrap();
        let err = import_package(&bogus, &dir.path().join("out"), "");
        assert!(matches!(err, Err(BackupError::MagicMismatch)));
    }

    #[test]
    fn export_skips_its_own_output_inside_the_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        make_repo(&repo);

        // Package written into the repository itself, twice: the second
        // export must not swallow the first output file.
        let pkg = repo.join("snapshot.sepkg");
        export_package(&repo, &pkg, &PackageOptions::default()).unwrap();
        export_package(&repo, &pkg, &PackageOptions::default()).unwrap();

        let rebuilt = dir.path().join("rebuilt");
        import_package(&pkg, &rebuilt, "").unwrap();
        assert!(!rebuilt.join("snapshot.sepkg").exists());
        assert_eq!(
            fsx::read(rebuilt.join("data/a/b.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn salts_differ_between_exports() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        make_repo(&repo);

        let opts = PackageOptions {
            encryption: Encryption::Xor,
            password: "pw".to_string(),
            ..Default::default()
        };
        let p1 = dir.path().join("one.sepkg");
        let p2 = dir.path().join("two.sepkg");
        export_package(&repo, &p1, &opts).unwrap();
        export_package(&repo, &p2, &opts).unwrap();

        let b1 = fsx::read(&p1).unwrap();
        let b2 = fsx::read(&p2).unwrap();
        assert_eq!(&b1[10..14], &[16, 0, 0, 0]);
        assert_ne!(&b1[14..30], &b2[14..30]);
    }
}

//! Whole-pipeline package tests: backup, export, import, restore.

use sepack::backup::Backup;
use sepack::package::{
    export_package, import_package, Compression, Encryption, PackLayout, PackageOptions,
};
use sepack::repository::Repository;
use sepack::restore::Restore;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::tempdir;

fn build_repo(dir: &Path) -> std::path::PathBuf {
    let src = dir.join("source");
    fs::create_dir_all(src.join("logs")).unwrap();
    fs::write(src.join("readme.txt"), b"plain text body").unwrap();
    fs::write(src.join("logs/run.log"), vec![b'a'; 600]).unwrap();
    fs::write(src.join("logs/empty.log"), b"").unwrap();

    let repo = dir.join("repo");
    let mut repository = Repository::new(&repo);
    repository.initialize().unwrap();
    Backup::new(&mut repository).execute(&src, None, None).unwrap();
    repo
}

fn roundtrip_with(opts: &PackageOptions, password: &str) {
    let dir = tempdir().unwrap();
    let repo = build_repo(dir.path());

    let pkg = dir.path().join("backup.sepkg");
    export_package(&repo, &pkg, opts).unwrap();

    let rebuilt = dir.path().join("rebuilt-repo");
    import_package(&pkg, &rebuilt, password).unwrap();

    // The imported repository is directly usable by the restore driver.
    let mut repository = Repository::new(&rebuilt);
    let out = dir.path().join("out");
    let mut restore = Restore::new(&mut repository);
    restore.execute(&out, None).unwrap();
    assert_eq!(restore.failed(), 0);

    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"plain text body");
    assert_eq!(fs::read(out.join("logs/run.log")).unwrap(), vec![b'a'; 600]);
    assert_eq!(fs::read(out.join("logs/empty.log")).unwrap(), b"");
}

#[test]
fn every_layout_compression_encryption_combination_roundtrips() {
    for layout in [PackLayout::HeaderPerFile, PackLayout::TocAtEnd] {
        for compression in [Compression::None, Compression::Rle] {
            for encryption in [Encryption::None, Encryption::Xor, Encryption::Rc4] {
                let password = if encryption == Encryption::None { "" } else { "hunter2" };
                let opts = PackageOptions {
                    layout,
                    compression,
                    encryption,
                    password: password.to_string(),
                };
                roundtrip_with(&opts, password);
            }
        }
    }
}

#[test]
fn truncated_toc_package_fails_to_import() {
    let dir = tempdir().unwrap();
    let repo = build_repo(dir.path());

    let pkg = dir.path().join("backup.sepkg");
    let opts = PackageOptions { layout: PackLayout::TocAtEnd, ..Default::default() };
    export_package(&repo, &pkg, &opts).unwrap();

    let f = OpenOptions::new().write(true).open(&pkg).unwrap();
    let len = f.metadata().unwrap().len();
    f.set_len(len - 5).unwrap();

    assert!(import_package(&pkg, &dir.path().join("rebuilt"), "").is_err());
}

#[test]
fn corrupted_magic_fails_to_import() {
    let dir = tempdir().unwrap();
    let repo = build_repo(dir.path());

    let pkg = dir.path().join("backup.sepkg");
    export_package(&repo, &pkg, &PackageOptions::default()).unwrap();

    let mut f = OpenOptions::new().write(true).open(&pkg).unwrap();
    f.seek(SeekFrom::Start(0)).unwrap();
    f.write_all(b"XXXXXX").unwrap();

    let err = import_package(&pkg, &dir.path().join("rebuilt"), "").unwrap_err();
    assert!(err.to_string().contains("magic"));
}

#[test]
fn header_and_toc_packages_carry_identical_content() {
    let dir = tempdir().unwrap();
    let repo = build_repo(dir.path());

    let header_pkg = dir.path().join("h.sepkg");
    let toc_pkg = dir.path().join("t.sepkg");
    export_package(
        &repo,
        &header_pkg,
        &PackageOptions { layout: PackLayout::HeaderPerFile, ..Default::default() },
    )
    .unwrap();
    export_package(
        &repo,
        &toc_pkg,
        &PackageOptions { layout: PackLayout::TocAtEnd, ..Default::default() },
    )
    .unwrap();

    let from_header = dir.path().join("from-header");
    let from_toc = dir.path().join("from-toc");
    import_package(&header_pkg, &from_header, "").unwrap();
    import_package(&toc_pkg, &from_toc, "").unwrap();

    for rel in ["index.txt", "data/readme.txt", "data/logs/run.log"] {
        assert_eq!(
            fs::read(from_header.join(rel)).unwrap(),
            fs::read(from_toc.join(rel)).unwrap(),
            "mismatch for {rel}"
        );
    }
}

#[test]
fn rle_actually_shrinks_runs() {
    let dir = tempdir().unwrap();
    let repo = build_repo(dir.path());

    let plain = dir.path().join("plain.sepkg");
    let packed = dir.path().join("packed.sepkg");
    export_package(&repo, &plain, &PackageOptions::default()).unwrap();
    export_package(
        &repo,
        &packed,
        &PackageOptions { compression: Compression::Rle, ..Default::default() },
    )
    .unwrap();

    // logs/run.log is 600 identical bytes; RLE collapses it.
    let plain_len = fs::metadata(&plain).unwrap().len();
    let packed_len = fs::metadata(&packed).unwrap().len();
    assert!(packed_len < plain_len);
}

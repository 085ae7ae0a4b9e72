//! The two package body layouts.
//!
//! `HeaderPerFile` frames each entry inline, so a reader streams the whole
//! body sequentially. `TocAtEnd` writes all payloads back-to-back, then a
//! table of contents and a trailing 8-byte offset to it, so a reader can
//! seek straight to any entry.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::BackupError;
use crate::package::io::{
    read_string, read_u32, read_u64, read_vec, write_bytes, write_string, write_u32, write_u64,
};
use crate::package::Entry;

const TOC_MAGIC: &[u8; 4] = b"TOC1";

/// `u32 count`, then per entry: path, original size, stored size, payload.
pub(crate) fn write_header_per_file<W: Write>(
    w: &mut W,
    entries: &[Entry],
) -> Result<(), BackupError> {
    write_u32(w, entries.len() as u32)?;
    for e in entries {
        write_string(w, &e.rel_path)?;
        write_u64(w, e.original_size)?;
        write_u64(w, e.payload.len() as u64)?;
        write_bytes(w, &e.payload)?;
    }
    Ok(())
}

pub(crate) fn read_header_per_file<R: Read>(r: &mut R) -> Result<Vec<Entry>, BackupError> {
    let count = read_u32(r)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let rel_path = read_string(r)?;
        let original_size = read_u64(r)?;
        let stored = read_u64(r)?;
        let payload = read_vec(r, stored as usize)?;
        entries.push(Entry { rel_path, original_size, payload });
    }
    Ok(entries)
}

/// Payload blobs first, then `TOC1` + `u32 count` + per-entry records, then
/// the absolute TOC offset as the last 8 bytes of the file.
///
/// `start` is the absolute file offset at which the first blob lands (the
/// size of the file header already written).
pub(crate) fn write_toc<W: Write>(
    w: &mut W,
    entries: &[Entry],
    start: u64,
) -> Result<(), BackupError> {
    let mut offset = start;
    let mut records = Vec::with_capacity(entries.len());
    for e in entries {
        write_bytes(w, &e.payload)?;
        records.push((offset, e.payload.len() as u64));
        offset += e.payload.len() as u64;
    }

    let toc_offset = offset;
    write_bytes(w, TOC_MAGIC)?;
    write_u32(w, entries.len() as u32)?;
    for (e, (blob_offset, stored)) in entries.iter().zip(&records) {
        write_string(w, &e.rel_path)?;
        write_u64(w, e.original_size)?;
        write_u64(w, *blob_offset)?;
        write_u64(w, *stored)?;
    }
    write_u64(w, toc_offset)?;
    Ok(())
}

pub(crate) fn read_toc<R: Read + Seek>(r: &mut R) -> Result<Vec<Entry>, BackupError> {
    let end = r.seek(SeekFrom::End(0))?;
    if end < 8 {
        return Err(BackupError::UnexpectedEof);
    }
    r.seek(SeekFrom::End(-8))?;
    let toc_offset = read_u64(r)?;
    if toc_offset > end - 8 {
        return Err(BackupError::CorruptStream("TOC offset beyond end of file".to_string()));
    }

    r.seek(SeekFrom::Start(toc_offset))?;
    let magic = read_vec(r, 4)?;
    if magic != TOC_MAGIC {
        return Err(BackupError::MagicMismatch);
    }

    let count = read_u32(r)?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let rel_path = read_string(r)?;
        let original_size = read_u64(r)?;
        let offset = read_u64(r)?;
        let stored = read_u64(r)?;
        records.push((rel_path, original_size, offset, stored));
    }

    let mut entries = Vec::with_capacity(records.len());
    for (rel_path, original_size, offset, stored) in records {
        r.seek(SeekFrom::Start(offset))?;
        let payload = read_vec(r, stored as usize)?;
        entries.push(Entry { rel_path, original_size, payload });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_entries() -> Vec<Entry> {
        vec![
            Entry { rel_path: "index.txt".to_string(), original_size: 6, payload: vec![5, 97, 1, 98] },
            Entry { rel_path: "data/a/b.txt".to_string(), original_size: 0, payload: vec![] },
            Entry { rel_path: "data/big".to_string(), original_size: 3, payload: vec![9, 9, 9] },
        ]
    }

    #[test]
    fn header_per_file_roundtrip() {
        let entries = sample_entries();
        let mut buf = Vec::new();
        write_header_per_file(&mut buf, &entries).unwrap();

        let parsed = read_header_per_file(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn header_per_file_truncation_fails() {
        let mut buf = Vec::new();
        write_header_per_file(&mut buf, &sample_entries()).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(matches!(
            read_header_per_file(&mut Cursor::new(buf)),
            Err(BackupError::UnexpectedEof)
        ));
    }

    #[test]
    fn toc_roundtrip_with_nonzero_start() {
        let entries = sample_entries();
        // Simulate a 14-byte file header before the body.
        let mut buf = vec![0u8; 14];
        write_toc(&mut buf, &entries, 14).unwrap();

        let mut cur = Cursor::new(buf);
        let parsed = read_toc(&mut cur).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn toc_magic_is_checked() {
        let entries = sample_entries();
        let mut buf = Vec::new();
        write_toc(&mut buf, &entries, 0).unwrap();
        // Payloads total 7 bytes; the TOC magic starts right after.
        let toc_at = 7;
        buf[toc_at] = b'X';
        assert!(matches!(read_toc(&mut Cursor::new(buf)), Err(BackupError::MagicMismatch)));
    }

    #[test]
    fn toc_of_tiny_file_fails_cleanly() {
        let mut cur = Cursor::new(vec![1u8, 2, 3]);
        assert!(matches!(read_toc(&mut cur), Err(BackupError::UnexpectedEof)));
    }

    #[test]
    fn toc_offset_out_of_range_is_corrupt() {
        let mut buf = Vec::new();
        write_u64(&mut buf, 999_999).unwrap();
        assert!(matches!(
            read_toc(&mut Cursor::new(buf)),
            Err(BackupError::CorruptStream(_))
        ));
    }
}

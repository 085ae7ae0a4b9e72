//! Little-endian binary primitives for the package format.
//!
//! All multi-byte integers are fixed-width little-endian. A length-prefixed
//! string is a `u32` byte count followed by the raw bytes, not terminated.
//! Reads that hit end-of-stream early fail with `UnexpectedEof`; short
//! writes are promoted to errors by `write_all`.

use std::io::{Read, Write};

use crate::error::BackupError;

fn map_read_err(e: std::io::Error) -> BackupError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BackupError::UnexpectedEof
    } else {
        BackupError::from(e)
    }
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<(), BackupError> {
    w.write_all(&[v])?;
    Ok(())
}

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8, BackupError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(buf[0])
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<(), BackupError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32, BackupError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<(), BackupError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64, BackupError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn write_bytes<W: Write>(w: &mut W, buf: &[u8]) -> Result<(), BackupError> {
    w.write_all(buf)?;
    Ok(())
}

pub fn read_vec<R: Read>(r: &mut R, n: usize) -> Result<Vec<u8>, BackupError> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(buf)
}

pub fn write_string<W: Write>(w: &mut W, s: &str) -> Result<(), BackupError> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub fn read_string<R: Read>(r: &mut R) -> Result<String, BackupError> {
    let n = read_u32(r)? as usize;
    let bytes = read_vec(r, n)?;
    String::from_utf8(bytes)
        .map_err(|_| BackupError::CorruptStream("length-prefixed string is not UTF-8".to_string()))
}

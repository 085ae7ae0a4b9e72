//! Keyed stream ciphers for the package format.
//!
//! Both ciphers are symmetric involutions: applying the same function with
//! the same password and salt twice yields the original bytes. They exist
//! for format compatibility and are **not** an authenticated or otherwise
//! trustworthy confidentiality mechanism.

use rand::rngs::OsRng;
use rand::RngCore;

const SALT_SIZE: usize = 16;

/// 16 random bytes from the operating system's entropy source.
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

// FNV-1a over password bytes, then salt bytes.
fn fnv1a32(password: &str, salt: &[u8]) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for &b in password.as_bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16_777_619);
    }
    for &b in salt {
        h ^= b as u32;
        h = h.wrapping_mul(16_777_619);
    }
    h
}

// xorshift32 keystream, one byte per step.
fn next_byte(x: &mut u32) -> u8 {
    *x ^= *x << 13;
    *x ^= *x >> 17;
    *x ^= *x << 5;
    (*x & 0xFF) as u8
}

/// XOR the input against a xorshift32 keystream seeded from
/// `FNV-1a(password ‖ salt)`.
pub fn xor_crypt(input: &[u8], password: &str, salt: &[u8]) -> Vec<u8> {
    let mut state = fnv1a32(password, salt);
    input.iter().map(|&b| b ^ next_byte(&mut state)).collect()
}

/// RC4-style stream cipher keyed with `password ‖ salt`.
///
/// An empty key is padded to a single zero byte before the key schedule.
pub fn rc4_crypt(input: &[u8], password: &str, salt: &[u8]) -> Vec<u8> {
    let mut key: Vec<u8> = password.as_bytes().to_vec();
    key.extend_from_slice(salt);
    if key.is_empty() {
        key.push(0);
    }

    let mut s: [u8; 256] = [0; 256];
    for (i, v) in s.iter_mut().enumerate() {
        *v = i as u8;
    }

    // KSA
    let mut j: usize = 0;
    for i in 0..256 {
        j = (j + s[i] as usize + key[i % key.len()] as usize) & 0xFF;
        s.swap(i, j);
    }

    // PRGA
    let mut out = Vec::with_capacity(input.len());
    let mut i: usize = 0;
    j = 0;
    for &b in input {
        i = (i + 1) & 0xFF;
        j = (j + s[i] as usize) & 0xFF;
        s.swap(i, j);
        let k = s[(s[i] as usize + s[j] as usize) & 0xFF];
        out.push(b ^ k);
    }
    out
}

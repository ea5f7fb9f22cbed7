//! Content digests of local files
//!
//! Uploads identify content by digest, so callers hash a file before deciding
//! whether it needs to be sent. Files are read in fixed-size blocks to keep
//! memory flat for large files.

use crate::error::{CacheError, CacheResult};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes read from the file at a time
pub const DEFAULT_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// MD5, the digest upload endpoints expect
    Md5,
    /// SHA-256
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        };
        write!(f, "{}", name)
    }
}

/// Hex-encoded MD5 of a file's content
pub fn md5_hex(path: &Path) -> CacheResult<String> {
    file_digest_hex::<Md5>(path, DEFAULT_BLOCK_SIZE)
}

/// Hex-encoded SHA-256 of a file's content
pub fn sha256_hex(path: &Path) -> CacheResult<String> {
    file_digest_hex::<Sha256>(path, DEFAULT_BLOCK_SIZE)
}

/// Hex-encoded digest of a file's content with the given algorithm
pub fn hex_digest(path: &Path, algorithm: DigestAlgorithm) -> CacheResult<String> {
    match algorithm {
        DigestAlgorithm::Md5 => md5_hex(path),
        DigestAlgorithm::Sha256 => sha256_hex(path),
    }
}

fn file_digest_hex<D: Digest>(path: &Path, block_size: usize) -> CacheResult<String> {
    let mut file = File::open(path)
        .map_err(|e| CacheError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = D::new();
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

//! Digest primitives: 64-byte BLAKE3 (extended output) over files, readers and strings.

use blake3::Hasher;
use memmap2::Mmap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::FsError;
use crate::utils::config::HashingConsts;

/// Width of every digest in bytes (128 hex characters).
pub const DIGEST_LEN: usize = 64;

pub type Digest = [u8; DIGEST_LEN];

fn finalize(hasher: &Hasher) -> Digest {
    let mut out = [0u8; DIGEST_LEN];
    hasher.finalize_xof().fill(&mut out);
    out
}

/// Lowercase hex of a digest.
pub fn to_hex(digest: &Digest) -> String {
    let mut s = String::with_capacity(DIGEST_LEN * 2);
    for b in digest {
        let _ = write!(s, "{b:02x}");
    }
    s
}

pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(data);
    finalize(&hasher)
}

pub fn hash_str(s: &str) -> Digest {
    hash_bytes(s.as_bytes())
}

/// Digest everything `reader` yields, in chunks.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<Digest> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(finalize(&hasher))
}

/// Hash a file's content. Uses memory-mapped I/O for files above threshold, chunked reading otherwise.
pub fn hash_file(path: &Path, size: u64) -> Result<Digest, FsError> {
    let file = File::open(path).map_err(|e| FsError::io(path, e))?;
    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        // SAFETY: read-only map; a concurrent writer can only change the digest, not memory safety of our reads.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| FsError::io(path, e))?;
        let mut hasher = Hasher::new();
        hasher.update(&mmap);
        return Ok(finalize(&hasher));
    }
    let reader = std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
    hash_reader(reader).map_err(|e| FsError::io(path, e))
}

//! Content fingerprints for equality checks.
//!
//! BLAKE3 over the whole file. Failure to read is not an error here: it
//! yields "unavailable", which callers must treat as "cannot prove equal".

use std::fmt;
use std::io::Read;
use std::path::Path;

/// Files above this size are hashed with the multi-threaded BLAKE3 path.
const PARALLEL_THRESHOLD: u64 = 1024 * 1024;

const CHUNK_SIZE: usize = 64 * 1024;

/// Read size for the multi-threaded path. Memory stays at one chunk
/// regardless of file size.
const PARALLEL_CHUNK_SIZE: usize = 1024 * 1024;

/// 256-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(blake3::Hash);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0.to_hex())
    }
}

/// Outcome of comparing two files by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equality {
    Equal,
    Different,
    /// At least one side could not be read.
    Indeterminate,
}

/// Hash a file, or `None` if it cannot be opened or read.
pub fn fingerprint(path: &Path) -> Option<Fingerprint> {
    hash_file(path).ok().map(Fingerprint)
}

fn hash_file(path: &Path) -> std::io::Result<blake3::Hash> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    let mut hasher = blake3::Hasher::new();
    if size > PARALLEL_THRESHOLD {
        let mut buffer = vec![0u8; PARALLEL_CHUNK_SIZE];
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update_rayon(&buffer[..bytes_read]);
        }
        return Ok(hasher.finalize());
    }

    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// Compare two files by fingerprint.
pub fn files_equal(a: &Path, b: &Path) -> Equality {
    match (fingerprint(a), fingerprint(b)) {
        (Some(fa), Some(fb)) if fa == fb => Equality::Equal,
        (Some(_), Some(_)) => Equality::Different,
        _ => Equality::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_fingerprint_matches_blake3() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"test content").unwrap();

        let fp = fingerprint(file.path()).unwrap();
        assert_eq!(fp.0, blake3::hash(b"test content"));
    }

    #[test]
    fn test_large_file_uses_same_digest() {
        let data = vec![7u8; (PARALLEL_THRESHOLD as usize) + 4096];
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let fp = fingerprint(file.path()).unwrap();
        assert_eq!(fp.0, blake3::hash(&data));
    }

    #[test]
    fn test_large_sparse_file_is_streamed() {
        // Several read chunks, not a multiple of the chunk size
        let len = 3 * PARALLEL_CHUNK_SIZE as u64 + 12_345;
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(len).unwrap();

        let mut expected = blake3::Hasher::new();
        let zeros = vec![0u8; CHUNK_SIZE];
        let mut remaining = len as usize;
        while remaining > 0 {
            let n = remaining.min(CHUNK_SIZE);
            expected.update(&zeros[..n]);
            remaining -= n;
        }

        let fp = fingerprint(file.path()).unwrap();
        assert_eq!(fp.0, expected.finalize());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        assert!(fingerprint(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_files_equal() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();
        std::fs::write(&c, "diff").unwrap();

        assert_eq!(files_equal(&a, &b), Equality::Equal);
        assert_eq!(files_equal(&a, &c), Equality::Different);
        assert_eq!(files_equal(&a, &dir.path().join("gone")), Equality::Indeterminate);
    }
}

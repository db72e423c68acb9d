use memmap2::MmapOptions;
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha512};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{Level, debug, span};

use crate::storage::EntryKind;

/// SHA-512 of zero bytes.
pub const SHA512_EMPTY: &str = concat!(
    "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce",
    "47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
);

/// SHA-256 of zero bytes.
pub const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Default size at which regular files are memory-mapped instead of streamed.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 1_048_576;

/// Digest algorithms a hash database can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-512, the interchange format of `sha512sum`.
    #[default]
    Sha512,
    /// SHA-256, the interchange format of `sha256sum`.
    Sha256,
}

impl DigestAlgorithm {
    /// Number of hex characters in a digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha512 => 128,
            Self::Sha256 => 64,
        }
    }

    /// Well-known digest of empty content.
    #[must_use]
    pub const fn empty_digest(self) -> &'static str {
        match self {
            Self::Sha512 => SHA512_EMPTY,
            Self::Sha256 => SHA256_EMPTY,
        }
    }

    /// File name `export` writes and `import` recognizes (`SHA512SUM`).
    #[must_use]
    pub const fn manifest_filename(self) -> &'static str {
        match self {
            Self::Sha512 => "SHA512SUM",
            Self::Sha256 => "SHA256SUM",
        }
    }

    /// Extension used by per-file manifests (`*.sha512sum`).
    #[must_use]
    pub const fn manifest_extension(self) -> &'static str {
        match self {
            Self::Sha512 => "sha512sum",
            Self::Sha256 => "sha256sum",
        }
    }

    /// True if `candidate` is a digest of the right length made of hex digits.
    #[must_use]
    pub fn is_valid_digest(self, candidate: &[u8]) -> bool {
        candidate.len() == self.hex_len() && candidate.iter().all(u8::is_ascii_hexdigit)
    }

    fn new_digest(self) -> Box<dyn DynDigest> {
        match self {
            Self::Sha512 => Box::new(Sha512::default()),
            Self::Sha256 => Box::new(Sha256::default()),
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Computes content digests for tracked files and symlinks.
///
/// A regular file hashes its byte content; an empty one short-circuits to
/// [`DigestAlgorithm::empty_digest`] without being opened. A symlink hashes
/// the bytes of its target string and is never followed, so re-pointing a
/// link changes its digest even when the link dangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hasher {
    algorithm: DigestAlgorithm,
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default(), DEFAULT_MMAP_THRESHOLD)
    }
}

impl Hasher {
    #[must_use]
    pub const fn new(algorithm: DigestAlgorithm, mmap_threshold: u64) -> Self {
        Self {
            algorithm,
            mmap_threshold,
        }
    }

    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hex digest of an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let mut digest = self.algorithm.new_digest();
        digest.update(data);
        to_hex(&digest.finalize())
    }

    /// Digest of whatever currently sits at `path`.
    ///
    /// Returns `Ok(None)` when the path has vanished (a concurrent delete) or
    /// names something that is neither a regular file nor a symlink.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub fn digest_path(&self, path: &Path) -> io::Result<Option<String>> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match EntryKind::from_file_type(metadata.file_type()) {
            Some(kind) => self.digest_kind(path, kind, metadata.len()),
            None => Ok(None),
        }
    }

    /// Digest of `path`, trusting the caller's view of its kind and size.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub fn digest_kind(
        &self,
        path: &Path,
        kind: EntryKind,
        size: u64,
    ) -> io::Result<Option<String>> {
        let span = span!(Level::TRACE, "digest", path = %path.display());
        let _guard = span.enter();

        let result = match kind {
            EntryKind::Symlink => std::fs::read_link(path)
                .map(|target| self.hash_bytes(target.as_os_str().as_encoded_bytes())),
            EntryKind::File if size == 0 => Ok(self.algorithm.empty_digest().to_string()),
            EntryKind::File => self.hash_file(path),
        };

        match result {
            Ok(digest) => Ok(Some(digest)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Path vanished before it could be hashed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn hash_file(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();

        if len == 0 {
            return Ok(self.algorithm.empty_digest().to_string());
        }

        if len >= self.mmap_threshold {
            // SAFETY: the map is read-only and dropped before this function
            // returns; a concurrent truncation surfaces as a changed digest on
            // the next run, the same as any other concurrent write.
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            return Ok(self.hash_bytes(&mmap));
        }

        let mut digest = self.algorithm.new_digest();
        let mut buffer = vec![0u8; 65536];
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            digest.update(&buffer[..bytes_read]);
        }
        Ok(to_hex(&digest.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_empty_digest_constants() {
        for algorithm in [DigestAlgorithm::Sha512, DigestAlgorithm::Sha256] {
            let hasher = Hasher::new(algorithm, DEFAULT_MMAP_THRESHOLD);
            assert_eq!(hasher.hash_bytes(b""), algorithm.empty_digest());
            assert_eq!(algorithm.empty_digest().len(), algorithm.hex_len());
        }
    }

    #[test]
    fn test_hash_bytes_known_value() {
        let hasher = Hasher::new(DigestAlgorithm::Sha256, DEFAULT_MMAP_THRESHOLD);
        assert_eq!(
            hasher.hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_file_stable() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.txt");
        std::fs::write(&file_path, "Test content for hashing")?;

        let hasher = Hasher::default();
        let hash1 = hasher.digest_path(&file_path)?;
        let hash2 = hasher.digest_path(&file_path)?;
        assert_eq!(hash1, hash2);
        assert_eq!(hash1, Some(hasher.hash_bytes(b"Test content for hashing")));

        Ok(())
    }

    #[test]
    fn test_mmap_and_streaming_agree() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("big.bin");
        let content = vec![b'x'; 4096];
        std::fs::write(&file_path, &content)?;

        let streamed = Hasher::new(DigestAlgorithm::Sha512, u64::MAX).digest_path(&file_path)?;
        let mapped = Hasher::new(DigestAlgorithm::Sha512, 1).digest_path(&file_path)?;
        assert_eq!(streamed, mapped);

        Ok(())
    }

    #[test]
    fn test_empty_file_uses_constant() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("empty");
        std::fs::write(&file_path, "")?;

        let hasher = Hasher::default();
        assert_eq!(
            hasher.digest_path(&file_path)?.as_deref(),
            Some(SHA512_EMPTY)
        );

        Ok(())
    }

    #[test]
    fn test_missing_path_is_none() -> Result<()> {
        let dir = tempdir()?;
        let hasher = Hasher::default();
        assert_eq!(hasher.digest_path(&dir.path().join("gone"))?, None);
        assert_eq!(
            hasher.digest_kind(&dir.path().join("gone"), EntryKind::File, 10)?,
            None
        );
        Ok(())
    }

    #[test]
    fn test_directory_has_no_digest() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(Hasher::default().digest_path(dir.path())?, None);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_hashes_target_string() -> Result<()> {
        let dir = tempdir()?;
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("does/not/exist", &link)?;

        let hasher = Hasher::default();
        assert_eq!(
            hasher.digest_path(&link)?,
            Some(hasher.hash_bytes(b"does/not/exist"))
        );

        Ok(())
    }

    #[test]
    fn test_digest_validation() {
        let algorithm = DigestAlgorithm::Sha512;
        assert!(algorithm.is_valid_digest(SHA512_EMPTY.as_bytes()));
        assert!(algorithm.is_valid_digest(SHA512_EMPTY.to_uppercase().as_bytes()));
        assert!(!algorithm.is_valid_digest(SHA256_EMPTY.as_bytes()));
        assert!(!algorithm.is_valid_digest(&[b'g'; 128]));
    }
}

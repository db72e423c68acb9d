//! `sha512sum`-style checksum manifests.
//!
//! One line per file: `<hex digest><sep><name>`, where `<sep>` is two spaces
//! (text mode) or a space and `*` (binary mode). When a name contains a
//! backslash or newline the line starts with `\` and the name escapes them as
//! `\\` and `\n`, the same convention `sha512sum` uses. Names are raw bytes.

use crate::error::{HashDbError, Result};
use crate::storage::{Entry, LiveMetadata, Snapshot};
use crate::utils::hash::DigestAlgorithm;
use crate::utils::paths::{normalize_lexically, os_string_from_bytes};
use crate::utils::serialization;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, span, warn};

/// One valid manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    /// Lowercase hex digest
    pub digest: String,
    /// File name bytes, unescaped, as written relative to the manifest
    pub name: Vec<u8>,
}

/// Parses one line, or `None` if it is not a `<digest><sep><name>` line for
/// `algorithm`.
#[must_use]
pub fn parse_line(line: &[u8], algorithm: DigestAlgorithm) -> Option<ManifestLine> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = line.trim_ascii_start();

    let (escaped, line) = match line.strip_prefix(b"\\") {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let hex_len = algorithm.hex_len();
    if line.len() <= hex_len + 2 {
        return None;
    }
    let (digest, rest) = line.split_at(hex_len);
    if !algorithm.is_valid_digest(digest) {
        return None;
    }
    let name = rest
        .strip_prefix(b"  ")
        .or_else(|| rest.strip_prefix(b" *"))?;

    let name = if escaped {
        unescape(name)?
    } else {
        name.to_vec()
    };

    Some(ManifestLine {
        digest: String::from_utf8_lossy(digest).to_ascii_lowercase(),
        name,
    })
}

/// Parses every valid line of a manifest, skipping the rest.
#[must_use]
pub fn parse_manifest(content: &[u8], algorithm: DigestAlgorithm) -> Vec<ManifestLine> {
    content
        .split(|&b| b == b'\n')
        .filter_map(|line| parse_line(line, algorithm))
        .collect()
}

fn unescape(name: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(name.len());
    let mut bytes = name.iter();
    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'\\') => out.push(b'\\'),
            Some(b'n') => out.push(b'\n'),
            _ => return None,
        }
    }
    Some(out)
}

fn escape(name: &[u8]) -> (bool, Vec<u8>) {
    if !name.iter().any(|&b| b == b'\\' || b == b'\n') {
        return (false, name.to_vec());
    }
    let mut out = Vec::with_capacity(name.len() + 2);
    for &b in name {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            other => out.push(other),
        }
    }
    (true, out)
}

/// Reads the manifest at `manifest_path` into `snapshot`.
///
/// Names resolve against the manifest's directory. Each imported entry gets
/// the manifest's digest and, if the file exists, its live metadata; a
/// missing file still gets an entry (kind [`File`], no metadata). Existing
/// entries for the same path are replaced.
///
/// Returns the number of entries imported.
///
/// [`File`]: crate::storage::EntryKind::File
///
/// # Errors
///
/// Returns an error if the manifest cannot be read.
pub fn import_manifest(
    snapshot: &mut Snapshot,
    manifest_path: &Path,
    algorithm: DigestAlgorithm,
) -> Result<usize> {
    let span = span!(Level::DEBUG, "import_manifest", path = %manifest_path.display());
    let _guard = span.enter();

    let content = std::fs::read(manifest_path).map_err(|e| HashDbError::io(manifest_path, e))?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("/"));
    let lines = parse_manifest(&content, algorithm);

    if lines.is_empty() && !content.is_empty() {
        warn!(path = %manifest_path.display(), "No valid checksum lines found");
    }

    let count = lines.len();
    for line in lines {
        let path = normalize_lexically(&base_dir.join(os_string_from_bytes(line.name)));
        let mut entry = Entry::new(path);
        entry.digest = Some(line.digest);
        entry.probe_kind();
        match LiveMetadata::probe(&entry.path) {
            Ok(live) if live.kind.is_some() => entry.stamp(&live),
            Ok(_) => {}
            Err(e) => debug!(path = %entry.path.display(), error = %e, "No metadata for imported entry"),
        }
        snapshot.insert(entry);
    }
    Ok(count)
}

/// Renders `snapshot` as manifest bytes, sorted by path.
///
/// Entries without a digest are skipped. Returns the bytes and the number of
/// lines written.
#[must_use]
pub fn render_manifest(snapshot: &Snapshot) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut count = 0;
    for entry in snapshot.entries.values() {
        let Some(digest) = entry.digest.as_deref() else {
            warn!(path = %entry.path.display(), "Skipping entry without a digest");
            continue;
        };
        let relative = snapshot.relative_path(&entry.path);
        let (escaped, name) = escape(relative.as_os_str().as_encoded_bytes());
        if escaped {
            out.push(b'\\');
        }
        out.extend_from_slice(digest.as_bytes());
        out.extend_from_slice(b"  ");
        out.extend_from_slice(&name);
        out.push(b'\n');
        count += 1;
    }
    (out, count)
}

/// Where [`export_manifest`] writes for `algorithm`.
#[must_use]
pub fn manifest_path(snapshot: &Snapshot, algorithm: DigestAlgorithm) -> PathBuf {
    snapshot.root.join(algorithm.manifest_filename())
}

/// Writes `snapshot` as `<root>/SHA512SUM` (or `SHA256SUM`), atomically.
///
/// Returns the file written and the number of entries in it.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn export_manifest(snapshot: &Snapshot, algorithm: DigestAlgorithm) -> Result<(PathBuf, usize)> {
    let path = manifest_path(snapshot, algorithm);
    let (content, count) = render_manifest(snapshot);
    serialization::write_atomic(&path, &content)?;
    debug!(path = %path.display(), count, "Exported manifest");
    Ok((path, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EntryKind;
    use crate::utils::hash::{Hasher, SHA256_EMPTY, SHA512_EMPTY};
    use anyhow::Result;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case::text_mode(format!("{SHA512_EMPTY}  empty.txt"), b"empty.txt".to_vec())]
    #[case::binary_mode(format!("{SHA512_EMPTY} *empty.txt"), b"empty.txt".to_vec())]
    #[case::crlf(format!("{SHA512_EMPTY}  empty.txt\r\n"), b"empty.txt".to_vec())]
    #[case::inner_spaces(format!("{SHA512_EMPTY}  a  b.txt"), b"a  b.txt".to_vec())]
    #[case::escaped(format!("\\{SHA512_EMPTY}  back\\\\slash\\nnewline"), b"back\\slash\nnewline".to_vec())]
    fn test_parse_line_accepts(#[case] line: String, #[case] name: Vec<u8>) {
        let parsed = parse_line(line.as_bytes(), DigestAlgorithm::Sha512).expect("valid line");
        assert_eq!(parsed.digest, SHA512_EMPTY);
        assert_eq!(parsed.name, name);
    }

    #[rstest]
    #[case::comment("# generated by sha512sum")]
    #[case::blank("")]
    #[case::short_digest("abc123  file.txt")]
    #[case::one_space(&format!("{SHA512_EMPTY} file.txt"))]
    #[case::no_name(&format!("{SHA512_EMPTY}  "))]
    #[case::wrong_algorithm(&format!("{SHA256_EMPTY}  file.txt"))]
    #[case::bad_escape(&format!("\\{SHA512_EMPTY}  bad\\q"))]
    fn test_parse_line_rejects(#[case] line: &str) {
        assert_eq!(parse_line(line.as_bytes(), DigestAlgorithm::Sha512), None);
    }

    #[test]
    fn test_uppercase_digest_is_lowered() {
        let line = format!("{}  x", SHA256_EMPTY.to_ascii_uppercase());
        let parsed = parse_line(line.as_bytes(), DigestAlgorithm::Sha256).expect("valid line");
        assert_eq!(parsed.digest, SHA256_EMPTY);
    }

    #[test]
    fn test_import_resolves_against_manifest_dir() -> Result<()> {
        let dir = tempdir()?;
        let sub = dir.path().join("sub");
        fs::create_dir(&sub)?;
        fs::write(sub.join("empty.txt"), "")?;
        let hasher = Hasher::default();
        let content = format!(
            "{SHA512_EMPTY}  empty.txt\nnot a checksum line\n{}  ../gone.txt\n",
            hasher.hash_bytes(b"gone")
        );
        fs::write(sub.join("SHA512SUM"), content)?;

        let mut snapshot = Snapshot::new(dir.path().to_path_buf());
        let count = import_manifest(&mut snapshot, &sub.join("SHA512SUM"), DigestAlgorithm::Sha512)?;
        assert_eq!(count, 2);

        let present = snapshot.get(&sub.join("empty.txt")).expect("imported");
        assert_eq!(present.digest.as_deref(), Some(SHA512_EMPTY));
        assert_eq!(present.size, Some(0));
        assert_eq!(present.kind, Some(EntryKind::File));

        let missing = snapshot.get(&dir.path().join("gone.txt")).expect("imported");
        assert_eq!(missing.size, None);
        assert_eq!(missing.mtime, None);
        assert_eq!(missing.kind, Some(EntryKind::File));
        Ok(())
    }

    #[test]
    fn test_render_sorted_and_escaped() {
        let root = PathBuf::from("/data");
        let mut snapshot = Snapshot::new(root.clone());
        for name in ["z.txt", "a.txt", "odd\\name"] {
            let mut entry = Entry::new(root.join(name));
            entry.digest = Some(SHA512_EMPTY.to_string());
            snapshot.insert(entry);
        }
        snapshot.insert(Entry::new(root.join("unhashed.txt")));

        let (content, count) = render_manifest(&snapshot);
        assert_eq!(count, 3);
        let expected = format!(
            "{SHA512_EMPTY}  a.txt\n\\{SHA512_EMPTY}  odd\\\\name\n{SHA512_EMPTY}  z.txt\n"
        );
        assert_eq!(String::from_utf8(content).expect("utf-8"), expected);
    }

    #[test]
    fn test_export_then_import_matches() -> Result<()> {
        let dir = tempdir()?;
        let mut snapshot = Snapshot::new(dir.path().to_path_buf());
        for (name, digest) in [("one", "1"), ("two\nlines", "2")] {
            let mut entry = Entry::new(dir.path().join(name));
            entry.digest = Some(digest.repeat(128));
            snapshot.insert(entry);
        }

        let (path, count) = export_manifest(&snapshot, DigestAlgorithm::Sha512)?;
        assert_eq!(path, dir.path().join("SHA512SUM"));
        assert_eq!(count, 2);

        let mut imported = Snapshot::new(dir.path().to_path_buf());
        import_manifest(&mut imported, &path, DigestAlgorithm::Sha512)?;
        let digests: Vec<_> = imported.entries.values().map(|e| e.digest.clone()).collect();
        let expected: Vec<_> = snapshot.entries.values().map(|e| e.digest.clone()).collect();
        assert_eq!(digests, expected);
        Ok(())
    }
}

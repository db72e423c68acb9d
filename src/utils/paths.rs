use anyhow::Result;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// First code point used to carry a non-UTF-8 byte inside a JSON string.
///
/// Byte `b` (always `>= 0x80`) is stored as `U+10FF00 + b`, which lands in the
/// last sixteen code points of supplementary private use area B.
const ESCAPED_BYTE_BASE: u32 = 0x0010_FF00;

/// Makes a path absolute against the current directory and resolves `.` and
/// `..` lexically, without touching the filesystem.
///
/// # Errors
///
/// Returns an error if the path is relative and the current directory cannot
/// be determined.
pub fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize_lexically(&absolute))
}

/// Resolves `.` and `..` components of an already absolute path.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Searches `start` and each of its ancestors for a regular file named
/// `filename`, returning the first match.
#[must_use]
pub fn find_in_ancestors(start: &Path, filename: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
}

/// Expresses `path` relative to `base`, climbing with `..` where the two
/// diverge. Both must be absolute and normalized.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(base) {
        return stripped.to_path_buf();
    }

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Encodes a path as a JSON-safe string, reversibly.
///
/// Valid UTF-8 passes through unchanged; every byte outside a valid UTF-8
/// sequence becomes one private-use code point (see [`ESCAPED_BYTE_BASE`]).
#[must_use]
pub fn encode_path(path: &Path) -> String {
    let bytes = path.as_os_str().as_encoded_bytes();
    let mut encoded = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        encoded.push_str(chunk.valid());
        for &byte in chunk.invalid() {
            if let Some(c) = char::from_u32(ESCAPED_BYTE_BASE + u32::from(byte)) {
                encoded.push(c);
            }
        }
    }
    encoded
}

/// Inverse of [`encode_path`].
#[must_use]
pub fn decode_path(encoded: &str) -> PathBuf {
    let mut bytes = Vec::with_capacity(encoded.len());
    for c in encoded.chars() {
        let code = u32::from(c);
        if code >= ESCAPED_BYTE_BASE + 0x80 {
            // Range check above bounds the difference to 0x80..=0xFF.
            #[allow(clippy::cast_possible_truncation)]
            bytes.push((code - ESCAPED_BYTE_BASE) as u8);
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    PathBuf::from(os_string_from_bytes(bytes))
}

/// Builds an OS string from raw filename bytes.
#[cfg(unix)]
#[must_use]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

/// Builds an OS string from raw filename bytes.
#[cfg(not(unix))]
#[must_use]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}

//! Logical path normalization and sanitization
//!
//! Archive strings may use either separator; the engine works on
//! forward-slash logical paths and leaves host-native translation to
//! the sinks. Every path is sanitized before it crosses a port: parent
//! references, absolute anchors, drive letters and embedded NUL bytes
//! are rejected outright rather than cleaned up.

use crate::{Error, Result};

/// Normalize separators and strip redundant `.` segments
pub fn normalize(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate a logical path for port crossing
///
/// Returns the normalized form, or [`Error::PathTraversal`] if the raw
/// path contains `..`, an absolute anchor, a drive letter or a NUL.
pub fn sanitize(raw: &str) -> Result<String> {
    let traversal = || Error::PathTraversal(raw.to_string());

    if raw.contains('\0') {
        return Err(traversal());
    }
    if raw.starts_with('/') || raw.starts_with('\\') {
        return Err(traversal());
    }
    // Drive letters anywhere reject too: `sub/C:/x` is no more welcome
    // than `C:/x`.
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' && i > 0 && bytes[i - 1].is_ascii_alphabetic() {
            let at_start = i == 1;
            let after_sep = i >= 2 && (bytes[i - 2] == b'/' || bytes[i - 2] == b'\\');
            if at_start || after_sep {
                return Err(traversal());
            }
        }
    }
    if raw.replace('\\', "/").split('/').any(|part| part == "..") {
        return Err(traversal());
    }

    Ok(normalize(raw))
}

/// Join a directory and file name into a sanitized logical path
pub fn join_logical(directory: &str, name: &str) -> Result<String> {
    let dir = sanitize(directory)?;
    let name = sanitize(name)?;
    if name.is_empty() {
        return Err(Error::PathTraversal(name));
    }
    if dir.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{dir}/{name}"))
    }
}

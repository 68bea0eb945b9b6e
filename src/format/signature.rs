//! Content probes used by the structural checks.
//!
//! These helpers only look at the first bytes of a file. They never fail: a
//! file that cannot be read simply does not carry the marker.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes inspected when looking for an INI section header.
pub const HEADER_PROBE_BYTES: usize = 500;

/// Bytes inspected when looking for a magic signature.
pub const SIGNATURE_PROBE_BYTES: usize = 32;

/// Read up to `len` bytes from the start of a file.
pub fn read_head(path: &Path, len: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut head)?;
    Ok(head)
}

/// Whether `marker` appears in the first [`HEADER_PROBE_BYTES`] of the file.
///
/// Invalid UTF-8 is replaced rather than rejected, so binary noise around an
/// INI header does not hide it.
pub fn contains_header_marker(path: &Path, marker: &str) -> bool {
    match read_head(path, HEADER_PROBE_BYTES) {
        Ok(head) => String::from_utf8_lossy(&head).contains(marker),
        Err(_) => false,
    }
}

/// Whether the file starts with `magic`.
pub fn starts_with_magic(path: &Path, magic: &[u8]) -> bool {
    match read_head(path, SIGNATURE_PROBE_BYTES.max(magic.len())) {
        Ok(head) => head.starts_with(magic),
        Err(_) => false,
    }
}

use md5::{Digest, Md5};
use std::path::PathBuf;

use crate::errors::SearchResult;
use crate::walk::normalize_roots;

/// File name prefix of every cached path list
pub const CACHE_FILE_PREFIX: &str = "finder-paths-";

/// Hex md5 of the absolute, sorted, de-duplicated roots, one per line.
/// The same set of roots in any order gives the same key.
pub fn cache_key(roots: &[PathBuf]) -> SearchResult<String> {
    let roots = normalize_roots(roots)?;
    let joined = roots
        .iter()
        .map(|r| r.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let digest = Md5::digest(joined.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Cache file name for a set of roots
pub fn cache_file_name(roots: &[PathBuf]) -> SearchResult<String> {
    Ok(format!("{}{}", CACHE_FILE_PREFIX, cache_key(roots)?))
}

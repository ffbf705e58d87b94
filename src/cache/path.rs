use std::path::{Path, PathBuf};

use wyhash::wyhash;

/// Derives the cache file path for a source asset path: `cache/<stem>-<hash
/// in hex>.meshlets`, where `<hash>` is `wyhash` of the source path's UTF-8
/// bytes.
///
/// Hashing the path itself (not the file's contents) means a renamed or
/// moved asset gets treated as a fresh cache miss rather than colliding
/// with its old entry — cheap, and conservative about staleness.
pub fn cache_path(source_path: &Path) -> PathBuf {
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    let hash = wyhash(source_path.to_string_lossy().as_bytes(), 0);
    PathBuf::from("cache").join(format!("{stem}-{hash:016x}.meshlets"))
}

// src/watch/hash.rs

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex-encoded blake3 hash of a file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading {path:?} for hashing"))?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn hash_follows_content() {
        let fs = MockFileSystem::new();
        fs.add_file("./a.css", "a{}");
        fs.add_file("./b.css", "a{}");
        let a = compute_file_hash(&fs, Path::new("./a.css")).unwrap();
        assert_eq!(a, compute_file_hash(&fs, Path::new("./b.css")).unwrap());
        assert_eq!(a.len(), 64);

        fs.add_file("./b.css", "b{}");
        assert_ne!(a, compute_file_hash(&fs, Path::new("./b.css")).unwrap());
    }
}

//! Content digest of a composed tree.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// File count and SHA-256 over sorted relative paths and file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDigest {
    pub file_count: usize,
    pub sha256: String,
}

/// Digest every regular file under `root` in sorted path order.
///
/// Timestamps are not part of the digest.
pub fn digest_tree(root: &Path) -> io::Result<TreeDigest> {
    let mut hasher = Sha256::new();
    let mut file_count = 0;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        io::copy(&mut File::open(entry.path())?, &mut hasher)?;
        hasher.update([0u8]);
        file_count += 1;
    }

    Ok(TreeDigest {
        file_count,
        sha256: hex::encode(hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_digest_counts_files() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a/b")).unwrap();
        fs::write(root.path().join("a/b/one"), "1").unwrap();
        fs::write(root.path().join("two"), "2").unwrap();

        let digest = digest_tree(root.path()).unwrap();
        assert_eq!(digest.file_count, 2);
        assert_eq!(digest.sha256.len(), 64);
    }

    #[test]
    fn test_digest_depends_on_content_and_path() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("f"), "same").unwrap();
        fs::write(b.path().join("f"), "same").unwrap();
        assert_eq!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());

        fs::write(b.path().join("f"), "different").unwrap();
        assert_ne!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());

        let c = TempDir::new().unwrap();
        fs::write(c.path().join("g"), "same").unwrap();
        assert_ne!(digest_tree(a.path()).unwrap(), digest_tree(c.path()).unwrap());
    }

    #[test]
    fn test_large_file_digest() {
        let root = TempDir::new().unwrap();
        let body = vec![7u8; 3 * 1024 * 1024 + 17];
        fs::write(root.path().join("big.bin"), &body).unwrap();

        let mut expected = Sha256::new();
        expected.update(b"big.bin");
        expected.update([0u8]);
        expected.update(&body);
        expected.update([0u8]);

        let digest = digest_tree(root.path()).unwrap();
        assert_eq!(digest.file_count, 1);
        assert_eq!(digest.sha256, hex::encode(expected.finalize()));
    }

    #[test]
    fn test_empty_tree() {
        let root = TempDir::new().unwrap();
        assert_eq!(digest_tree(root.path()).unwrap().file_count, 0);
    }
}

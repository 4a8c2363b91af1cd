//! SHA-256 helpers for snapshots and release artifacts.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA-256 digest.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while reading a file for hashing.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file {path}")]
pub struct HashError {
  pub path: String,
  #[source]
  pub source: std::io::Error,
}

/// Hash a file's contents, streaming in 8 KiB chunks.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let to_err = |source| HashError {
    path: path.display().to_string(),
    source,
  };

  let mut file = fs::File::open(path).map_err(to_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(to_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn hash_bytes_known_vector() {
    assert_eq!(
      hash_bytes(b"hello world").0,
      "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
  }

  #[test]
  fn hash_file_matches_hash_bytes() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("blob.bin");
    let data = vec![7u8; 20_000];
    fs::write(&path, &data).unwrap();

    assert_eq!(hash_file(&path).unwrap(), hash_bytes(&data));
  }

  #[test]
  fn hash_missing_file_reports_path() {
    let err = hash_file(Path::new("/nonexistent/file.tar.gz")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/file.tar.gz"));
  }
}

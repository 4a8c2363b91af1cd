//! Verification of exported release artifacts.
//!
//! The checksum file is `shasum -a 256` output: a hex digest, whitespace, and
//! the path the archive had inside the container. Only the digest is compared.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;
use tar::Archive;
use thiserror::Error;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::consts::{BINARY_NAME, PACKAGED_DOCS};
use crate::util::hash::{HashError, hash_file};

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("artifact not found: {0}")]
  Missing(String),

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("failed to read {path}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("checksum file {0} is empty or malformed")]
  MalformedChecksum(String),

  #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
  ChecksumMismatch {
    path: String,
    expected: String,
    actual: String,
  },

  #[error("archive {path} is missing {missing:?}")]
  IncompleteArchive { path: String, missing: Vec<String> },
}

/// Local paths of an exported archive and its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
  pub archive: PathBuf,
  pub checksum: PathBuf,
}

impl ArtifactPaths {
  pub fn new(config: &PipelineConfig) -> Self {
    Self {
      archive: config.artifact_path(),
      checksum: config.checksum_path(),
    }
  }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedArtifact {
  pub archive: PathBuf,
  pub sha256: String,
  pub entries: Vec<String>,
}

/// Check the archive against its checksum and required contents.
pub fn verify(paths: &ArtifactPaths) -> Result<VerifiedArtifact, ArtifactError> {
  for path in [&paths.archive, &paths.checksum] {
    if !path.is_file() {
      return Err(ArtifactError::Missing(path.display().to_string()));
    }
  }

  let expected = read_checksum(&paths.checksum)?;
  let actual = hash_file(&paths.archive)?;
  if actual.0 != expected {
    return Err(ArtifactError::ChecksumMismatch {
      path: paths.archive.display().to_string(),
      expected,
      actual: actual.0,
    });
  }
  debug!(archive = %paths.archive.display(), sha256 = %actual, "checksum verified");

  let entries = list_entries(&paths.archive)?;
  let missing: Vec<String> = std::iter::once(BINARY_NAME)
    .chain(PACKAGED_DOCS.iter().copied())
    .filter(|required| !entries.iter().any(|e| e == required))
    .map(String::from)
    .collect();
  if !missing.is_empty() {
    return Err(ArtifactError::IncompleteArchive {
      path: paths.archive.display().to_string(),
      missing,
    });
  }

  Ok(VerifiedArtifact {
    archive: paths.archive.clone(),
    sha256: actual.0,
    entries,
  })
}

/// Lowercased digest from a `shasum` line.
fn read_checksum(path: &Path) -> Result<String, ArtifactError> {
  let content = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
    path: path.display().to_string(),
    source,
  })?;

  content
    .split_whitespace()
    .next()
    .filter(|digest| digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()))
    .map(str::to_ascii_lowercase)
    .ok_or_else(|| ArtifactError::MalformedChecksum(path.display().to_string()))
}

/// Entry paths of a `.tar.gz` archive.
fn list_entries(archive_path: &Path) -> Result<Vec<String>, ArtifactError> {
  let to_err = |source| ArtifactError::Read {
    path: archive_path.display().to_string(),
    source,
  };

  let file = File::open(archive_path).map_err(to_err)?;
  let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

  let mut entries = Vec::new();
  for entry in archive.entries().map_err(to_err)? {
    let entry = entry.map_err(to_err)?;
    let path = entry.path().map_err(to_err)?;
    entries.push(path.to_string_lossy().trim_start_matches("./").to_string());
  }
  Ok(entries)
}

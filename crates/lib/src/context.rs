//! Execution context: the filtered source snapshot uploaded into a container.
//!
//! A context is resolved once per stage from a local directory. Entries whose
//! file name appears in the exclusion list are skipped at every depth, along
//! with everything beneath them.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::consts::CONTEXT_EXCLUDE;
use crate::util::hash::{ContentHash, hash_bytes, hash_file};

#[derive(Debug, Error)]
pub enum ContextError {
  #[error("source directory not found: {0}")]
  NotFound(String),

  #[error("source is not a directory: {0}")]
  NotADirectory(String),

  #[error("failed to walk source directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read {path}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to archive {path}")]
  Archive {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// Kind of a snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
  File,
  Dir,
  Symlink(PathBuf),
}

/// One entry of the snapshot, relative to the context root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
  pub path: PathBuf,
  pub kind: EntryKind,
}

/// A resolved directory snapshot ready for upload.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  root: PathBuf,
  exclude: Vec<String>,
  entries: Vec<ContextEntry>,
}

impl ExecutionContext {
  /// Resolve `src` with the default exclusion list.
  pub fn load(src: &Path) -> Result<Self, ContextError> {
    Self::resolve(src, CONTEXT_EXCLUDE)
  }

  /// Walk `src` and record every entry not covered by `exclude`.
  pub fn resolve(src: &Path, exclude: &[&str]) -> Result<Self, ContextError> {
    if !src.exists() {
      return Err(ContextError::NotFound(src.display().to_string()));
    }
    if !src.is_dir() {
      return Err(ContextError::NotADirectory(src.display().to_string()));
    }

    let root = dunce::canonicalize(src).map_err(|source| ContextError::Read {
      path: src.display().to_string(),
      source,
    })?;

    let walker = WalkDir::new(&root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| {
        e.depth() == 0
          || e
            .file_name()
            .to_str()
            .map(|name| !exclude.contains(&name))
            .unwrap_or(true)
      });

    let mut entries = Vec::new();
    for entry in walker {
      let entry = entry.map_err(|e| ContextError::WalkDir { message: e.to_string() })?;
      if entry.depth() == 0 {
        continue;
      }

      let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path()).to_path_buf();
      let file_type = entry.file_type();
      let kind = if file_type.is_symlink() {
        let target = fs::read_link(entry.path()).map_err(|source| ContextError::Read {
          path: entry.path().display().to_string(),
          source,
        })?;
        EntryKind::Symlink(target)
      } else if file_type.is_dir() {
        EntryKind::Dir
      } else if file_type.is_file() {
        EntryKind::File
      } else {
        // sockets, fifos, devices
        continue;
      };

      entries.push(ContextEntry { path: rel, kind });
    }

    debug!(root = %root.display(), entries = entries.len(), "resolved execution context");

    Ok(Self {
      root,
      exclude: exclude.iter().map(|s| s.to_string()).collect(),
      entries,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn exclude(&self) -> &[String] {
    &self.exclude
  }

  pub fn entries(&self) -> &[ContextEntry] {
    &self.entries
  }

  pub fn contains(&self, rel: impl AsRef<Path>) -> bool {
    self.entries.iter().any(|e| e.path == rel.as_ref())
  }

  /// Serialize the snapshot as an uncompressed tar stream.
  pub fn to_tar(&self) -> Result<Vec<u8>, ContextError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    for entry in &self.entries {
      let abs = self.root.join(&entry.path);
      let to_err = |source| ContextError::Archive {
        path: entry.path.display().to_string(),
        source,
      };

      match entry.kind {
        EntryKind::Dir => builder.append_dir(&entry.path, &abs).map_err(to_err)?,
        EntryKind::File | EntryKind::Symlink(_) => builder.append_path_with_name(&abs, &entry.path).map_err(to_err)?,
      }
    }

    builder.into_inner().map_err(|source| ContextError::Archive {
      path: self.root.display().to_string(),
      source,
    })
  }

  /// Deterministic SHA-256 over paths, file contents and symlink targets.
  pub fn content_hash(&self) -> Result<ContentHash, ContextError> {
    let mut manifest = String::new();

    for entry in &self.entries {
      let rel = entry.path.to_string_lossy();
      let line = match &entry.kind {
        EntryKind::File => {
          let abs = self.root.join(&entry.path);
          let hash = hash_file(&abs).map_err(|e| ContextError::Read {
            path: e.path,
            source: e.source,
          })?;
          format!("F:{}:{}", rel, hash)
        }
        EntryKind::Dir => format!("D:{}", rel),
        EntryKind::Symlink(target) => format!("L:{}:{}", rel, target.to_string_lossy()),
      };
      manifest.push_str(&line);
      manifest.push('\n');
    }

    Ok(hash_bytes(manifest.as_bytes()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeSet;
  use tempfile::tempdir;

  fn sample_tree() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("Cargo.toml"), "[package]\nname = \"oh-my-droid\"\n").unwrap();
    fs::create_dir_all(root.join("src/cmd")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/cmd/setup.rs"), "pub fn setup() {}\n").unwrap();

    fs::create_dir_all(root.join("target/release")).unwrap();
    fs::write(root.join("target/release/oh-my-droid"), "binary").unwrap();
    fs::create_dir_all(root.join(".git/objects")).unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::create_dir_all(root.join(".devbox")).unwrap();
    fs::write(root.join(".devbox/state"), "x").unwrap();
    fs::create_dir_all(root.join(".fluentci/src")).unwrap();
    fs::write(root.join(".fluentci/src/jobs.ts"), "x").unwrap();
    temp
  }

  #[test]
  fn excludes_default_entries() {
    let temp = sample_tree();
    let ctx = ExecutionContext::load(temp.path()).unwrap();

    let names: BTreeSet<_> = ctx.entries().iter().map(|e| e.path.to_string_lossy().to_string()).collect();
    assert!(names.contains("Cargo.toml"));
    assert!(names.contains("src/cmd/setup.rs"));
    for excluded in CONTEXT_EXCLUDE {
      assert!(
        !names.iter().any(|n| n.split('/').any(|part| part == *excluded)),
        "{} leaked into context",
        excluded
      );
    }
  }

  #[test]
  fn excludes_nested_matches() {
    let temp = sample_tree();
    fs::create_dir_all(temp.path().join("crates/sub/target/debug")).unwrap();
    fs::write(temp.path().join("crates/sub/target/debug/junk"), "x").unwrap();
    fs::write(temp.path().join("crates/sub/lib.rs"), "").unwrap();

    let ctx = ExecutionContext::load(temp.path()).unwrap();
    assert!(ctx.contains("crates/sub/lib.rs"));
    assert!(!ctx.contains("crates/sub/target"));
    assert!(!ctx.contains("crates/sub/target/debug/junk"));
  }

  #[test]
  fn missing_source_is_an_error() {
    let err = ExecutionContext::load(Path::new("/nonexistent/omd-ci-src")).unwrap_err();
    assert!(matches!(err, ContextError::NotFound(_)));
  }

  #[test]
  fn file_source_is_an_error() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    let err = ExecutionContext::load(&file).unwrap_err();
    assert!(matches!(err, ContextError::NotADirectory(_)));
  }

  #[test]
  fn tar_contains_only_snapshot_entries() {
    let temp = sample_tree();
    let ctx = ExecutionContext::load(temp.path()).unwrap();
    let bytes = ctx.to_tar().unwrap();

    let mut archive = tar::Archive::new(bytes.as_slice());
    let paths: BTreeSet<String> = archive
      .entries()
      .unwrap()
      .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
      .collect();

    assert!(paths.contains("Cargo.toml"));
    assert!(paths.contains("src/main.rs"));
    assert!(!paths.iter().any(|p| p.starts_with("target") || p.starts_with(".git")));
    assert_eq!(paths.len(), ctx.entries().len());
  }

  #[cfg(unix)]
  #[test]
  fn symlinks_are_recorded_not_followed() {
    let temp = sample_tree();
    std::os::unix::fs::symlink("src/main.rs", temp.path().join("main-link")).unwrap();

    let ctx = ExecutionContext::load(temp.path()).unwrap();
    let link = ctx.entries().iter().find(|e| e.path == Path::new("main-link")).unwrap();
    assert_eq!(link.kind, EntryKind::Symlink(PathBuf::from("src/main.rs")));
  }

  #[test]
  fn content_hash_ignores_excluded_entries() {
    let temp = sample_tree();
    let before = ExecutionContext::load(temp.path()).unwrap().content_hash().unwrap();

    fs::write(temp.path().join("target/release/oh-my-droid"), "rebuilt").unwrap();
    fs::write(temp.path().join(".git/HEAD"), "ref: refs/heads/other\n").unwrap();
    let after = ExecutionContext::load(temp.path()).unwrap().content_hash().unwrap();

    assert_eq!(before, after);
  }

  #[test]
  fn content_hash_tracks_source_changes() {
    let temp = sample_tree();
    let before = ExecutionContext::load(temp.path()).unwrap().content_hash().unwrap();

    fs::write(temp.path().join("src/main.rs"), "fn main() { println!(); }\n").unwrap();
    let after = ExecutionContext::load(temp.path()).unwrap().content_hash().unwrap();

    assert_ne!(before, after);
  }
}

//! Atomic, change-detecting file materialization.
//!
//! Content is rendered to a sibling temp file first, hashed against the
//! current target, and copied over it only when the bytes differ. A failed
//! render or write never leaves the target partially overwritten, and an
//! unchanged aggregate never touches the target's mtime.

pub mod syntax;

pub use syntax::Syntax;

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Suffix of the staging file written next to the target.
///
/// Destination file names must not themselves end with this suffix.
pub const TMP_SUFFIX: &str = ".tmp";

/// Materialization errors.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Writing the staging file failed; the target was never touched.
    #[error("failed to write staging file {}: {source}", path.display())]
    TempWrite { path: PathBuf, source: io::Error },

    /// Hashing the staging or target file failed.
    #[error("failed to hash {}: {source}", path.display())]
    Hash { path: PathBuf, source: io::Error },

    /// Copying the staging file over the target failed.
    #[error("failed to replace {}: {source}", path.display())]
    Replace { path: PathBuf, source: io::Error },
}

/// Outcome of one write attempt. Used for logging and gating decisions
/// only; never persisted.
#[derive(Debug, Clone)]
pub struct MaterializationResult {
    pub target: PathBuf,
    /// Digest of the target before the attempt; `None` on first run.
    pub hash_before: Option<String>,
    /// Digest of the freshly rendered content.
    pub hash_after: String,
    /// Whether the target was actually rewritten.
    pub changed: bool,
}

/// Renders aggregates and publishes them to destination files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMaterializer;

impl FileMaterializer {
    pub fn new() -> Self {
        Self
    }

    /// Materializes an all-in-one aggregate into `target`.
    ///
    /// Namespaces are rendered in the order given, which is the
    /// application's configured order rather than map iteration order.
    pub fn materialize(
        &self,
        target: &Path,
        syntax: Syntax,
        namespaces: &[String],
        data: &HashMap<String, HashMap<String, String>>,
    ) -> Result<MaterializationResult, MaterializeError> {
        let content = syntax::render_multi(syntax, namespaces, data);
        self.publish(target, content.as_bytes())
    }

    /// Materializes a single namespace into its own `target`.
    pub fn materialize_single(
        &self,
        target: &Path,
        syntax: Syntax,
        configs: &HashMap<String, String>,
    ) -> Result<MaterializationResult, MaterializeError> {
        let content = syntax::render_single(syntax, configs);
        self.publish(target, content.as_bytes())
    }

    /// Writes `content` to the staging file and replaces `target` if and
    /// only if the rendered bytes differ from what is already on disk.
    fn publish(
        &self,
        target: &Path,
        content: &[u8],
    ) -> Result<MaterializationResult, MaterializeError> {
        let staging = staging_path(target);

        fs::write(&staging, content).map_err(|source| MaterializeError::TempWrite {
            path: staging.clone(),
            source,
        })?;

        let hash_after = match hash_file(&staging) {
            Ok(hash) => hash,
            Err(source) => {
                let _ = fs::remove_file(&staging);
                return Err(MaterializeError::Hash {
                    path: staging,
                    source,
                });
            }
        };

        // A missing target is a mismatch: first runs always publish.
        let hash_before = match hash_file(target) {
            Ok(hash) => Some(hash),
            Err(source) if source.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                let _ = fs::remove_file(&staging);
                return Err(MaterializeError::Hash {
                    path: target.to_path_buf(),
                    source,
                });
            }
        };

        let changed = hash_before.as_deref() != Some(hash_after.as_str());
        if changed {
            // Copy rather than rename: the target may live on a different
            // filesystem than this process can rename across.
            if let Err(source) = fs::copy(&staging, target) {
                let _ = fs::remove_file(&staging);
                return Err(MaterializeError::Replace {
                    path: target.to_path_buf(),
                    source,
                });
            }
        }
        let _ = fs::remove_file(&staging);

        debug!(
            target = %target.display(),
            changed,
            hash = %hash_after,
            "materialization finished"
        );

        Ok(MaterializationResult {
            target: target.to_path_buf(),
            hash_before,
            hash_after,
            changed,
        })
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut raw = target.as_os_str().to_os_string();
    raw.push(TMP_SUFFIX);
    PathBuf::from(raw)
}

fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_aggregate() -> (Vec<String>, HashMap<String, HashMap<String, String>>) {
        let namespaces = vec!["a.properties".to_string(), "b.yml".to_string()];
        let mut data = HashMap::new();
        data.insert("a.properties".to_string(), kv(&[("k1", "v1")]));
        data.insert("b.yml".to_string(), kv(&[("k2", "v2")]));
        (namespaces, data)
    }

    #[test]
    fn test_first_run_always_writes() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        let (namespaces, data) = sample_aggregate();

        let result = FileMaterializer::new()
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();

        assert!(result.changed);
        assert!(result.hash_before.is_none());
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "###a###\nk1=v1\n\n###b###\nk2=v2\n\n"
        );
    }

    #[test]
    fn test_second_materialization_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        let (namespaces, data) = sample_aggregate();
        let materializer = FileMaterializer::new();

        let first = materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();
        let before = fs::read_to_string(&target).unwrap();

        let second = materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.hash_before.as_deref(), Some(first.hash_after.as_str()));
        assert_eq!(second.hash_after, first.hash_after);
        assert_eq!(fs::read_to_string(&target).unwrap(), before);
    }

    #[test]
    fn test_changed_content_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        let (namespaces, mut data) = sample_aggregate();
        let materializer = FileMaterializer::new();

        materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();

        data.insert("a.properties".to_string(), kv(&[("k1", "changed")]));
        let result = materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();

        assert!(result.changed);
        assert!(fs::read_to_string(&target).unwrap().contains("k1=changed"));
    }

    #[test]
    fn test_staging_file_is_removed_in_both_outcomes() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        let staging = dir.path().join("app.env.tmp");
        let (namespaces, data) = sample_aggregate();
        let materializer = FileMaterializer::new();

        materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();
        assert!(!staging.exists());

        materializer
            .materialize(&target, Syntax::Env, &namespaces, &data)
            .unwrap();
        assert!(!staging.exists());
    }

    #[test]
    fn test_failed_staging_write_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        fs::write(&target, "previous content").unwrap();

        // A directory squatting on the staging path makes the staging
        // write fail before the target is ever considered.
        fs::create_dir(dir.path().join("app.env.tmp")).unwrap();

        let (namespaces, data) = sample_aggregate();
        let result = FileMaterializer::new().materialize(&target, Syntax::Env, &namespaces, &data);

        assert!(matches!(result, Err(MaterializeError::TempWrite { .. })));
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous content");
    }

    #[test]
    fn test_materialize_single_env() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("mysql.env");

        let result = FileMaterializer::new()
            .materialize_single(&target, Syntax::Env, &kv(&[("port", "3306"), ("host", "db")]))
            .unwrap();

        assert!(result.changed);
        assert_eq!(fs::read_to_string(&target).unwrap(), "host=db\nport=3306\n");
    }
}

//! Local bare mirrors of remote repositories.
//!
//! One bare git directory per repository, at a path that is a pure function
//! of (host, full name): `<root>/<host>/<owner>/<name>`.  A mirror exists
//! iff at least one sync has succeeded for that repository.  This module is
//! the only writer of those directories.

use std::path::PathBuf;

use tracing::info;

use crate::error::PipelineError;

use super::commands;

#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic on-disk location for a repository's mirror.  Full names
    /// are validated at event-parse time, so joining them here cannot escape
    /// the root.
    pub fn mirror_path(&self, host: &str, full_name: &str) -> PathBuf {
        self.root.join(host).join(full_name)
    }

    /// Bring the mirror for `full_name` up to date with its remote.
    ///
    /// Missing directory: full bare clone.  Existing directory: validated,
    /// then a forced fetch of all refs -- run after a fresh clone too, so
    /// both paths converge on the same state.  Idempotent: repeating the
    /// call with no upstream change succeeds and leaves the mirror
    /// byte-for-byte equivalent.
    pub async fn sync(
        &self,
        host: &str,
        full_name: &str,
        clone_url: &str,
        env_vars: &[(String, String)],
    ) -> Result<PathBuf, PipelineError> {
        let dir = self.mirror_path(host, full_name);

        match tokio::fs::metadata(&dir).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                commands::git_clone_bare(clone_url, &dir, env_vars)
                    .await
                    .map_err(|e| PipelineError::GitSync(format!("{e:#}")))?;
                info!(repo = %full_name, dir = %dir.display(), "cloned mirror");
            }
            Err(e) => {
                return Err(PipelineError::GitSync(format!(
                    "stat {}: {e}",
                    dir.display()
                )));
            }
            Ok(meta) if !meta.is_dir() => {
                return Err(PipelineError::GitSync(format!(
                    "{} exists and is not a directory",
                    dir.display()
                )));
            }
            Ok(_) => {}
        }

        commands::git_fetch_all(&dir, env_vars)
            .await
            .map_err(|e| PipelineError::GitSync(format!("{e:#}")))?;

        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn mirror_path_is_deterministic() {
        let store = MirrorStore::new("/persist/repos");
        assert_eq!(
            store.mirror_path("github.com", "acme/widgets"),
            Path::new("/persist/repos/github.com/acme/widgets")
        );
        // Same inputs, same path.
        assert_eq!(
            store.mirror_path("github.com", "acme/widgets"),
            store.mirror_path("github.com", "acme/widgets")
        );
    }

    #[test]
    fn distinct_repos_never_collide() {
        let store = MirrorStore::new("/persist/repos");
        let names = ["acme/widgets", "acme/gadgets", "other/widgets", "a/b.c"];
        let paths: Vec<_> = names
            .iter()
            .map(|n| store.mirror_path("github.com", n))
            .collect();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn sync_rejects_non_directory_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MirrorStore::new(tmp.path());
        let path = store.mirror_path("github.com", "acme/widgets");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, b"not a repo").await.unwrap();

        let err = store
            .sync("github.com", "acme/widgets", "unused", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}

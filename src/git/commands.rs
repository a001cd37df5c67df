//! Git command wrappers using [`tokio::process::Command`].
//!
//! Every function in this module shells out to the system `git` binary for
//! the actual work.  Credentials (installation tokens) are injected via the
//! `env_vars` parameter so that they never appear on a command line.
//!
//! Failures carry the trimmed git stderr so callers can surface the real
//! reason a clone or fetch went wrong.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

/// Run `git clone --bare --quiet <url> <dest>` with the supplied environment
/// variables, creating any missing parent directories first.
#[instrument(skip(env_vars), fields(%url, dest = %dest.display()))]
pub async fn git_clone_bare(url: &str, dest: &Path, env_vars: &[(String, String)]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create parent directory: {}", parent.display()))?;
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--bare").arg("--quiet").arg(url).arg(dest);

    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for (k, v) in env_vars {
        cmd.env(k, v);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("spawning git clone --bare");

    let output = cmd
        .output()
        .await
        .context("failed to spawn git clone --bare")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git clone --bare failed (status {}): {}",
            output.status,
            stderr.trim(),
        );
    }

    debug!("git clone --bare succeeded");
    Ok(())
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Run a forced fetch of every ref from `origin` inside an existing bare
/// repo.  With no upstream change this is a no-op, which is what makes
/// mirror syncs idempotent.
#[instrument(skip(env_vars), fields(repo = %repo_path.display()))]
pub async fn git_fetch_all(repo_path: &Path, env_vars: &[(String, String)]) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_path)
        .arg("fetch")
        .arg("--quiet")
        .arg("--force")
        .arg("origin")
        .arg("+refs/*:refs/*");

    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for (k, v) in env_vars {
        cmd.env(k, v);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("spawning git fetch");

    let output = cmd.output().await.context("failed to spawn git fetch")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git fetch failed (status {}): {}",
            output.status,
            stderr.trim(),
        );
    }

    debug!("git fetch complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

/// Run `git show <rev>:<path>` inside a bare repo and return the blob bytes.
///
/// Fails when the revision or the path does not exist; callers decide
/// whether that is an error or merely "not configured".
#[instrument(fields(repo = %repo_path.display(), %rev, %path))]
pub async fn git_show(repo_path: &Path, rev: &str, path: &str) -> Result<Vec<u8>> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_path)
        .arg("show")
        .arg(format!("{rev}:{path}"));

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().await.context("failed to spawn git show")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git show {rev}:{path} failed (status {}): {}",
            output.status,
            stderr.trim(),
        );
    }

    Ok(output.stdout)
}

use std::path::Path;

use crate::domains::git::command::{probe_git, CommandRunner};
use crate::errors::WorkspaceError;

/// Does `refs/heads/<branch>` exist?
pub async fn local_branch_exists<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
    branch: &str,
) -> Result<bool, WorkspaceError> {
    let reference = format!("refs/heads/{branch}");
    Ok(probe_git(runner, repo_path, &["rev-parse", "--verify", &reference])
        .await?
        .is_some())
}

/// Does `refs/remotes/<reference>` exist? `reference` carries the remote
/// prefix, e.g. `origin/main`.
pub async fn remote_ref_exists<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
    reference: &str,
) -> Result<bool, WorkspaceError> {
    let reference = format!("refs/remotes/{reference}");
    Ok(probe_git(runner, repo_path, &["rev-parse", "--verify", &reference])
        .await?
        .is_some())
}

/// Currently checked-out branch, or `None` when HEAD is detached.
pub async fn current_branch<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
) -> Result<Option<String>, WorkspaceError> {
    let head = probe_git(runner, repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    Ok(head.filter(|name| name != "HEAD"))
}

/// Whether the repository has a remote with the given name.
pub async fn has_remote<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
    name: &str,
) -> Result<bool, WorkspaceError> {
    Ok(probe_git(runner, repo_path, &["remote", "get-url", name])
        .await?
        .is_some())
}

/// Resolve the repository's default branch.
///
/// Preference order: the remote's symbolic HEAD, well-known remote branches,
/// the locally checked-out branch, well-known local branches, then the
/// literal `main`. Only the `set-head` refresh may touch the network, and its
/// failure is ignored so offline repositories still resolve.
pub async fn resolve_default_branch<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
) -> Result<String, WorkspaceError> {
    if has_remote(runner, repo_path, "origin").await? {
        match probe_git(runner, repo_path, &["remote", "set-head", "origin", "--auto"]).await {
            Ok(_) => {}
            Err(err) => log::debug!("remote set-head failed (ignored): {err}"),
        }

        if let Some(head) =
            probe_git(runner, repo_path, &["symbolic-ref", "refs/remotes/origin/HEAD"]).await?
        {
            if let Some(branch) = head.strip_prefix("refs/remotes/") {
                log::debug!("Default branch from origin/HEAD: {branch}");
                return Ok(branch.to_string());
            }
        }

    }

    for candidate in ["origin/main", "origin/master"] {
        if remote_ref_exists(runner, repo_path, candidate).await? {
            return Ok(candidate.to_string());
        }
    }

    if let Some(branch) = current_branch(runner, repo_path).await? {
        return Ok(branch);
    }

    for candidate in ["main", "master"] {
        if local_branch_exists(runner, repo_path, candidate).await? {
            return Ok(candidate.to_string());
        }
    }

    log::warn!(
        "Could not detect a default branch for {}, assuming 'main'",
        repo_path.display()
    );
    Ok("main".to_string())
}

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domains::git::command::{run_git, CommandRunner};
use crate::errors::WorkspaceError;

/// One entry of git's worktree registry, parsed from
/// `git worktree list --porcelain`. Always recomputed on demand; git owns
/// this state and caching it would only let it go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
    pub is_bare: bool,
}

pub fn parse_worktree_list(porcelain: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in porcelain.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(entry) = current.take() {
                worktrees.push(entry);
            }
            current = Some(WorktreeInfo {
                path: PathBuf::from(path),
                branch: None,
                head: None,
                is_bare: false,
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(branch) = line.strip_prefix("branch refs/heads/") {
                entry.branch = Some(branch.to_string());
            } else if let Some(head) = line.strip_prefix("HEAD ") {
                entry.head = Some(head.to_string());
            } else if line == "bare" {
                entry.is_bare = true;
            }
        }
    }

    if let Some(entry) = current {
        worktrees.push(entry);
    }

    worktrees
}

pub async fn list_worktrees<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
) -> Result<Vec<WorktreeInfo>, WorkspaceError> {
    let porcelain = run_git(
        runner,
        repo_path,
        &["worktree", "list", "--porcelain"],
        "Failed to list worktrees",
    )
    .await?;
    Ok(parse_worktree_list(&porcelain))
}

/// Drop stale worktree metadata. Callers treat this as best-effort; a failed
/// prune must never block fresh provisioning.
pub async fn prune_worktrees<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
) -> Result<(), WorkspaceError> {
    run_git(
        runner,
        repo_path,
        &["worktree", "prune"],
        "Failed to prune worktrees",
    )
    .await?;
    Ok(())
}

/// Remove a worktree through git. No pre-checks: git validates the path and
/// its own registry, and its stderr is classified for the caller.
pub async fn remove_worktree<R: CommandRunner + ?Sized>(
    runner: &R,
    repo_path: &Path,
    worktree_path: &Path,
) -> Result<(), WorkspaceError> {
    let path = worktree_path.to_string_lossy();
    log::info!("Removing worktree at {path}");
    run_git(
        runner,
        repo_path,
        &["worktree", "remove", path.as_ref(), "--force"],
        "Failed to remove worktree",
    )
    .await?;
    Ok(())
}

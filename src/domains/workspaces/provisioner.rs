use std::path::{Path, PathBuf};

use crate::domains::git::command::{run_git, CommandRunner, SystemCommandRunner};
use crate::domains::git::refs::{
    has_remote, local_branch_exists, remote_ref_exists, resolve_default_branch,
};
use crate::domains::git::worktrees::{self, WorktreeInfo};
use crate::domains::github::{GhCache, GithubCli};
use crate::domains::workspaces::entity::{
    worktree_path_for, ProvisioningProgress, ProvisioningStage,
};
use crate::domains::workspaces::env_files::copy_env_files;
use crate::domains::workspaces::naming::{sanitize_branch_name, sanitize_worktree_name};
use crate::errors::{WorkspaceError, WorkspaceErrorCode};

/// What to provision. `branch` is the ref the worktree should end up on;
/// with `new_branch` it is created from `base_branch` (or the repository's
/// default branch when unset).
#[derive(Debug, Clone)]
pub struct CreateWorktreeRequest {
    pub name: String,
    pub branch: String,
    pub new_branch: bool,
    pub base_branch: Option<String>,
    pub force: bool,
}

/// Drives worktree provisioning end to end. Construct one per process: it
/// owns the gh memoization, and a fresh instance per call would re-probe the
/// CLI every time.
pub struct WorkspaceProvisioner<R: CommandRunner = SystemCommandRunner> {
    runner: R,
    gh_cache: GhCache,
}

impl WorkspaceProvisioner<SystemCommandRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner)
    }
}

impl Default for WorkspaceProvisioner<SystemCommandRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> WorkspaceProvisioner<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            gh_cache: GhCache::new(),
        }
    }

    /// Create a worktree for the requested workspace and return its path.
    ///
    /// The pipeline runs sequentially and reports each stage through
    /// `on_progress` before executing it; passing a no-op closure is fine,
    /// no stage is skipped for lack of a listener. Side effects on failure
    /// are bounded: a failed stage leaves at most a pruned registry and a
    /// fetched origin behind, never a half-registered worktree.
    pub async fn create_worktree(
        &self,
        repo_path: &Path,
        request: &CreateWorktreeRequest,
        mut on_progress: impl FnMut(ProvisioningProgress),
    ) -> Result<PathBuf, WorkspaceError> {
        let name = sanitize_worktree_name(&request.name);
        let branch = sanitize_branch_name(&request.branch);
        if branch.is_empty() {
            return Err(WorkspaceError::message(format!(
                "Branch name {:?} is empty after sanitization",
                request.branch
            )));
        }

        let worktree_path = worktree_path_for(repo_path, &name);
        let parent = repo_path.parent().unwrap_or(repo_path);
        if worktree_path.parent() != Some(parent) {
            return Err(WorkspaceError::message("Invalid workspace name"));
        }

        log::info!(
            "Provisioning workspace '{name}' on branch '{branch}' at {}",
            worktree_path.display()
        );

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::PruneWorktrees,
            "Pruning stale worktree entries",
        ));
        if let Err(err) = worktrees::prune_worktrees(&self.runner, repo_path).await {
            log::warn!("Worktree prune failed (continuing): {err}");
        }

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::FetchOrigin,
            "Fetching latest refs from origin",
        ));
        if has_remote(&self.runner, repo_path, "origin").await? {
            if let Err(err) = run_git(
                &self.runner,
                repo_path,
                &["fetch", "--prune", "origin"],
                "Failed to fetch origin",
            )
            .await
            {
                log::warn!("Fetch from origin failed (continuing): {err}");
            }
        }

        let base_branch = if request.new_branch && request.base_branch.is_none() {
            on_progress(ProvisioningProgress::new(
                ProvisioningStage::ResolveDefaultBranch,
                "Resolving default branch",
            ));
            Some(resolve_default_branch(&self.runner, repo_path).await?)
        } else {
            request.base_branch.clone()
        };

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::PrepareWorktreeDir,
            format!("Preparing {}", worktree_path.display()),
        ));
        if worktree_path.exists() {
            if !request.force {
                return Err(WorkspaceError::new(
                    WorkspaceErrorCode::WorktreePathExists,
                    format!("Worktree path {} already exists", worktree_path.display()),
                ));
            }
            log::info!("Force: removing existing {}", worktree_path.display());
            std::fs::remove_dir_all(&worktree_path)
                .map_err(|err| WorkspaceError::message(format!(
                    "Could not remove {}: {err}",
                    worktree_path.display()
                )))?;
        }

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::InspectBranch,
            format!("Inspecting branch '{branch}'"),
        ));
        let mut branch_present = local_branch_exists(&self.runner, repo_path, &branch).await?;
        if !request.new_branch && !branch_present {
            let on_origin =
                remote_ref_exists(&self.runner, repo_path, &format!("origin/{branch}")).await?;
            if !on_origin {
                // Last resort for fork PRs, whose heads a plain fetch never
                // brings in. Any failure falls through to git's own
                // "branch not found" on the add below.
                let gh = GithubCli::with_runner(&self.runner, &self.gh_cache);
                if gh.fetch_pr_branch(repo_path, &request.branch, &branch).await {
                    branch_present =
                        local_branch_exists(&self.runner, repo_path, &branch).await?;
                }
            }
        }

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::CreateWorktree,
            format!("Creating worktree at {}", worktree_path.display()),
        ));
        let path_str = worktree_path.to_string_lossy().to_string();
        let mut args: Vec<&str> = vec!["worktree", "add"];
        if request.force {
            args.push("--force");
        }
        // A requested new branch that already exists is checked out instead
        // of failing; re-creating it would either error or clobber history.
        let create_branch = request.new_branch && !branch_present;
        if create_branch {
            args.extend(["-b", &branch, &path_str]);
            if let Some(base) = base_branch.as_deref() {
                args.push(base);
            }
        } else {
            args.extend([path_str.as_str(), branch.as_str()]);
        }
        run_git(&self.runner, repo_path, &args, "Failed to create worktree").await?;

        if !create_branch {
            on_progress(ProvisioningProgress::new(
                ProvisioningStage::SyncBranch,
                format!("Fast-forwarding '{branch}'"),
            ));
            if has_remote(&self.runner, repo_path, "origin").await? {
                if let Err(err) = run_git(
                    &self.runner,
                    &worktree_path,
                    &["pull", "--ff-only"],
                    "Failed to fast-forward branch",
                )
                .await
                {
                    log::warn!("Fast-forward of '{branch}' failed (continuing): {err}");
                }
            }
        }

        on_progress(ProvisioningProgress::new(
            ProvisioningStage::CopyEnvFiles,
            "Copying environment files",
        ));
        let copied = copy_env_files(repo_path, &worktree_path);
        if copied > 0 {
            log::info!("Copied {copied} env file(s) into {}", worktree_path.display());
        }

        Ok(worktree_path)
    }

    pub async fn remove_worktree(
        &self,
        repo_path: &Path,
        worktree_path: &Path,
    ) -> Result<(), WorkspaceError> {
        worktrees::remove_worktree(&self.runner, repo_path, worktree_path).await
    }

    pub async fn list_worktrees(
        &self,
        repo_path: &Path,
    ) -> Result<Vec<WorktreeInfo>, WorkspaceError> {
        worktrees::list_worktrees(&self.runner, repo_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::git::command::SystemCommandRunner;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn setup_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().join("demo");
        std::fs::create_dir(&repo_path).unwrap();

        git(&repo_path, &["init", "--initial-branch=main"]);
        git(&repo_path, &["config", "user.email", "test@example.com"]);
        git(&repo_path, &["config", "user.name", "Test User"]);
        std::fs::write(repo_path.join("README.md"), "Initial").unwrap();
        git(&repo_path, &["add", "."]);
        git(&repo_path, &["commit", "-m", "init"]);

        (temp_dir, repo_path)
    }

    fn request(name: &str, branch: &str, new_branch: bool) -> CreateWorktreeRequest {
        CreateWorktreeRequest {
            name: name.to_string(),
            branch: branch.to_string(),
            new_branch,
            base_branch: None,
            force: false,
        }
    }

    #[tokio::test]
    async fn creates_worktree_with_new_branch_from_default_tip() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let mut stages = Vec::new();
        let path = provisioner
            .create_worktree(&repo, &request("Feature One", "feature-one", true), |p| {
                stages.push(p.stage)
            })
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "demo-ws-feature-one");
        assert!(path.join("README.md").exists());
        assert_eq!(git(&repo, &["rev-parse", "feature-one"]), git(&repo, &["rev-parse", "main"]));
        assert_eq!(
            stages,
            vec![
                ProvisioningStage::PruneWorktrees,
                ProvisioningStage::FetchOrigin,
                ProvisioningStage::ResolveDefaultBranch,
                ProvisioningStage::PrepareWorktreeDir,
                ProvisioningStage::InspectBranch,
                ProvisioningStage::CreateWorktree,
                ProvisioningStage::CopyEnvFiles,
            ]
        );
    }

    #[tokio::test]
    async fn second_create_reports_worktree_path_exists() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        provisioner
            .create_worktree(&repo, &request("dup", "dup-branch", true), |_| {})
            .await
            .unwrap();
        let err = provisioner
            .create_worktree(&repo, &request("dup", "other-branch", true), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.code, Some(WorkspaceErrorCode::WorktreePathExists));
    }

    #[tokio::test]
    async fn checked_out_branch_is_reported_as_such() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        // "main" is checked out in the primary worktree.
        let err = provisioner
            .create_worktree(&repo, &request("clash", "main", false), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.code, Some(WorkspaceErrorCode::BranchCheckedOut));
    }

    #[tokio::test]
    async fn force_replaces_a_stale_directory() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let stale = worktree_path_for(&repo, "forced");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("leftover.txt"), "old").unwrap();

        let mut req = request("forced", "forced-branch", true);
        req.force = true;
        let path = provisioner
            .create_worktree(&repo, &req, |_| {})
            .await
            .unwrap();

        assert!(!path.join("leftover.txt").exists());
        assert!(path.join("README.md").exists());
    }

    #[tokio::test]
    async fn remove_then_recreate_succeeds() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let req = request("cycle", "cycle-branch", true);
        let path = provisioner.create_worktree(&repo, &req, |_| {}).await.unwrap();
        provisioner.remove_worktree(&repo, &path).await.unwrap();
        assert!(!path.exists());

        // The branch survives removal, so recreate checks it out.
        let path = provisioner.create_worktree(&repo, &req, |_| {}).await.unwrap();
        assert_eq!(git(&path, &["rev-parse", "--abbrev-ref", "HEAD"]), "cycle-branch");
    }

    #[tokio::test]
    async fn requested_new_branch_that_exists_is_checked_out() {
        let (_tmp, repo) = setup_test_repo();
        git(&repo, &["branch", "existing"]);
        let provisioner = WorkspaceProvisioner::new();

        let path = provisioner
            .create_worktree(&repo, &request("exists", "existing", true), |_| {})
            .await
            .unwrap();

        assert_eq!(git(&path, &["rev-parse", "--abbrev-ref", "HEAD"]), "existing");
    }

    #[tokio::test]
    async fn env_files_travel_into_the_worktree() {
        let (_tmp, repo) = setup_test_repo();
        std::fs::write(repo.join(".env"), "SECRET=1").unwrap();
        std::fs::create_dir_all(repo.join("api")).unwrap();
        std::fs::write(repo.join("api/.env.local"), "PORT=3000").unwrap();
        let provisioner = WorkspaceProvisioner::new();

        let path = provisioner
            .create_worktree(&repo, &request("envs", "envs-branch", true), |_| {})
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(path.join(".env")).unwrap(), "SECRET=1");
        assert_eq!(
            std::fs::read_to_string(path.join("api/.env.local")).unwrap(),
            "PORT=3000"
        );
    }

    #[tokio::test]
    async fn empty_branch_after_sanitization_is_fatal() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let err = provisioner
            .create_worktree(&repo, &request("bad", "...", false), |_| {})
            .await
            .unwrap_err();

        assert!(err.message.contains("empty after sanitization"));
    }

    #[tokio::test]
    async fn listing_includes_provisioned_worktrees() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let path = provisioner
            .create_worktree(&repo, &request("listed", "listed-branch", true), |_| {})
            .await
            .unwrap();

        let listed = provisioner.list_worktrees(&repo).await.unwrap();
        assert!(listed.iter().any(|w| w.path == path
            && w.branch.as_deref() == Some("listed-branch")));
    }

    #[tokio::test]
    async fn missing_branch_without_remote_reports_not_found() {
        let (_tmp, repo) = setup_test_repo();
        let provisioner = WorkspaceProvisioner::new();

        let err = provisioner
            .create_worktree(&repo, &request("ghost", "no-such-branch", false), |_| {})
            .await
            .unwrap_err();

        assert!(err.message.contains("no-such-branch"), "{}", err.message);
    }

    #[test]
    fn names_are_sanitized_before_path_derivation() {
        let repo = Path::new("/repos/demo");
        let path = worktree_path_for(repo, &sanitize_worktree_name("../escape"));
        assert_eq!(path.parent(), Some(Path::new("/repos")));
        assert_eq!(path.file_name().unwrap(), "demo-ws-escape");
    }
}

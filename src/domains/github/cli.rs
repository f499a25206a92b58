use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::domains::git::command::{probe_git, run_git, CommandRunner, SystemCommandRunner};
use crate::domains::workspaces::naming::sanitize_branch_name;

/// Availability probes are the only calls we bound with a timeout. The
/// provisioning pipeline's own git commands may legitimately run long
/// (a fetch over a slow link), so they are never timed out.
const AVAILABILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide memo for gh state. Constructed explicitly (once per process)
/// and passed by reference so its lifetime and invalidation are visible to
/// tests instead of hiding in module statics.
#[derive(Default)]
pub struct GhCache {
    cli_available: OnceCell<bool>,
    github_repos: DashMap<PathBuf, bool>,
}

impl GhCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Thin wrapper over the GitHub CLI. Every operation here is best-effort:
/// a missing binary, an unauthenticated user, or a repo without a matching
/// PR all degrade to `None`/`false` and the caller falls through to its
/// ordinary failure path.
pub struct GithubCli<'c, R: CommandRunner = SystemCommandRunner> {
    runner: &'c R,
    cache: &'c GhCache,
    program: String,
}

impl<'c> GithubCli<'c, SystemCommandRunner> {
    pub fn new(cache: &'c GhCache) -> Self {
        Self::with_runner(&SystemCommandRunner, cache)
    }
}

impl<'c, R: CommandRunner> GithubCli<'c, R> {
    pub fn with_runner(runner: &'c R, cache: &'c GhCache) -> Self {
        Self {
            runner,
            cache,
            program: resolve_gh_program(),
        }
    }

    /// Whether the gh binary answers `--version`, memoized for the process.
    pub async fn is_available(&self, cwd: &Path) -> bool {
        if let Some(available) = self.cache.cli_available.get() {
            return *available;
        }

        let probe = tokio::time::timeout(
            AVAILABILITY_PROBE_TIMEOUT,
            self.runner.run(&self.program, &["--version"], Some(cwd)),
        )
        .await;

        let available = match probe {
            Ok(Ok(output)) if output.success() => {
                log::debug!("GitHub CLI detected: {}", output.stdout.trim());
                true
            }
            Ok(Ok(output)) => {
                log::debug!("gh --version exited with {:?}", output.status);
                false
            }
            Ok(Err(err)) => {
                log::debug!("GitHub CLI not runnable: {err}");
                false
            }
            Err(_) => {
                log::debug!("gh --version probe timed out");
                false
            }
        };

        let _ = self.cache.cli_available.set(available);
        available
    }

    /// Whether `origin` points at github.com, memoized per repository path.
    pub async fn is_github_repo(&self, repo_path: &Path) -> bool {
        if let Some(known) = self.cache.github_repos.get(repo_path) {
            return *known;
        }

        let url = probe_git(self.runner, repo_path, &["remote", "get-url", "origin"])
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let is_github = url.contains("github.com");

        self.cache
            .github_repos
            .insert(repo_path.to_path_buf(), is_github);
        is_github
    }

    /// Look up a PR whose head matches the given ref. Returns `None` on any
    /// failure, including gh simply not finding one.
    pub async fn find_pr_number(&self, repo_path: &Path, head: &str) -> Option<i64> {
        let args = [
            "pr",
            "list",
            "--head",
            head,
            "--state",
            "all",
            "--json",
            "number",
            "--jq",
            ".[0].number",
        ];
        let output = self
            .runner
            .run(&self.program, &args, Some(repo_path))
            .await
            .ok()?;
        if !output.success() {
            log::debug!("gh pr list --head {head} failed: {}", output.stderr.trim());
            return None;
        }
        output.stdout.trim().parse::<i64>().ok()
    }

    /// Materialize a branch that only exists as a fork/PR head. A plain
    /// `git fetch origin` never brings fork branches in, but
    /// `pull/<n>/head` refs live on the base repository, so fetching one
    /// of those gives us a local branch to check out.
    ///
    /// Returns `true` only when the branch was actually fetched. Everything
    /// else (no gh, no GitHub remote, no matching PR, a failed fetch) is
    /// logged and reported as `false` so the caller's normal "branch not
    /// found" handling takes over.
    pub async fn fetch_pr_branch(&self, repo_path: &Path, requested: &str, branch: &str) -> bool {
        if !self.is_available(repo_path).await || !self.is_github_repo(repo_path).await {
            return false;
        }

        for candidate in pr_head_candidates(requested, branch) {
            let Some(number) = self.find_pr_number(repo_path, &candidate).await else {
                continue;
            };
            log::info!("Found PR #{number} for head '{candidate}', fetching into '{branch}'");
            let refspec = format!("pull/{number}/head:{branch}");
            match run_git(
                self.runner,
                repo_path,
                &["fetch", "origin", &refspec],
                "Failed to fetch PR head",
            )
            .await
            {
                Ok(_) => return true,
                Err(err) => {
                    log::warn!("Fetching PR #{number} failed: {err}");
                    return false;
                }
            }
        }

        false
    }
}

/// Candidates to try against `gh pr list --head`, most specific first: the
/// raw requested ref, the branch part of an `owner:branch` style ref, and
/// the sanitized branch name.
fn pr_head_candidates(requested: &str, branch: &str) -> Vec<String> {
    let mut candidates = vec![requested.to_string()];
    if let Some((_, head)) = requested.split_once(':') {
        if !head.is_empty() {
            candidates.push(head.to_string());
        }
    }
    candidates.push(branch.to_string());

    let sanitized = sanitize_branch_name(requested);
    if !sanitized.is_empty() {
        candidates.push(sanitized);
    }

    candidates.dedup();
    candidates
}

fn resolve_gh_program() -> String {
    match which::which("gh") {
        Ok(path) => path.to_string_lossy().to_string(),
        Err(_) => "gh".to_string(),
    }
}

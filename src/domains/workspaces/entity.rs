use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A repository known to the manager. Identified by its canonical path; the
/// display name is derived, never stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub repo_path: PathBuf,
}

impl Project {
    pub fn new(repo_path: PathBuf) -> Self {
        Self { repo_path }
    }

    /// Last path component of the repository, used as a prefix for worktree
    /// directory names.
    pub fn name(&self) -> String {
        self.repo_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string())
    }
}

/// A provisioned workspace: one branch checked out in one worktree directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub worktree_path: PathBuf,
    pub project_id: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: String, branch: String, worktree_path: PathBuf, project: &Project) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            branch,
            worktree_path,
            project_id: project.repo_path.clone(),
            created_at: Utc::now(),
        }
    }
}

/// The stages of worktree provisioning, in pipeline order. Reported through
/// the progress callback so UIs can show what a long-running create is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningStage {
    PruneWorktrees,
    FetchOrigin,
    ResolveDefaultBranch,
    PrepareWorktreeDir,
    InspectBranch,
    CreateWorktree,
    SyncBranch,
    CopyEnvFiles,
}

impl ProvisioningStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PruneWorktrees => "prune-worktrees",
            Self::FetchOrigin => "fetch-origin",
            Self::ResolveDefaultBranch => "resolve-default-branch",
            Self::PrepareWorktreeDir => "prepare-worktree-dir",
            Self::InspectBranch => "inspect-branch",
            Self::CreateWorktree => "create-worktree",
            Self::SyncBranch => "sync-branch",
            Self::CopyEnvFiles => "copy-env-files",
        }
    }
}

/// One progress event emitted during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningProgress {
    pub stage: ProvisioningStage,
    pub message: String,
}

impl ProvisioningProgress {
    pub fn new(stage: ProvisioningStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Derive the worktree directory for a workspace: a sibling of the
/// repository named `<repo>-ws-<name>`. Keeping worktrees outside the repo
/// means no .gitignore entries and no accidental nesting.
pub fn worktree_path_for(repo_path: &Path, sanitized_name: &str) -> PathBuf {
    let repo_name = repo_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string());
    let parent = repo_path.parent().unwrap_or(repo_path);
    parent.join(format!("{repo_name}-ws-{sanitized_name}"))
}

pub mod entity;
pub mod env_files;
pub mod naming;
pub mod provisioner;

pub use entity::{
    worktree_path_for, Project, ProvisioningProgress, ProvisioningStage, Workspace,
};
pub use env_files::copy_env_files;
pub use naming::{sanitize_branch_name, sanitize_worktree_name, FALLBACK_WORKSPACE_NAME};
pub use provisioner::{CreateWorktreeRequest, WorkspaceProvisioner};

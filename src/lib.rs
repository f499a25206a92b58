pub mod domains;
pub mod errors;

pub use domains::git::{CommandOutput, CommandRunner, SystemCommandRunner, WorktreeInfo};
pub use domains::github::{GhCache, GithubCli};
pub use domains::workspaces::{
    CreateWorktreeRequest, Project, ProvisioningProgress, ProvisioningStage, Workspace,
    WorkspaceProvisioner,
};
pub use errors::{WorkspaceError, WorkspaceErrorCode};

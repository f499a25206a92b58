pub mod command;
pub mod refs;
pub mod worktrees;

pub use command::{probe_git, run_git, CommandOutput, CommandRunner, SystemCommandRunner};
pub use refs::{
    current_branch, has_remote, local_branch_exists, remote_ref_exists, resolve_default_branch,
};
pub use worktrees::{list_worktrees, parse_worktree_list, prune_worktrees, remove_worktree, WorktreeInfo};

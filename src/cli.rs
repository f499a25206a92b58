use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "werkbank", about = "Provision git worktrees for parallel workspaces")]
pub struct Cli {
    /// Repository to operate on. Defaults to the current directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Create a workspace worktree.
    Create {
        /// Workspace name; sanitized into the worktree directory name.
        name: String,

        /// Branch to check out. Defaults to the sanitized workspace name.
        #[arg(long)]
        branch: Option<String>,

        /// Create the branch instead of checking out an existing one.
        #[arg(long)]
        new_branch: bool,

        /// Base for a new branch. Defaults to the repository's default branch.
        #[arg(long, value_name = "REF")]
        base: Option<String>,

        /// Replace an existing directory at the worktree path.
        #[arg(long)]
        force: bool,
    },

    /// Remove a workspace worktree.
    Remove {
        /// Workspace name whose worktree should be removed.
        name: String,
    },

    /// List the repository's worktrees.
    List,
}

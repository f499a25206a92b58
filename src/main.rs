mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use werkbank::domains::workspaces::{
    sanitize_worktree_name, worktree_path_for, CreateWorktreeRequest, Project, Workspace,
    WorkspaceProvisioner,
};

use cli::{Cli, CliCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let repo_path = match args.repo {
        Some(path) => path,
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    let repo_path = repo_path
        .canonicalize()
        .with_context(|| format!("repository path {} not found", repo_path.display()))?;

    let provisioner = WorkspaceProvisioner::new();

    match args.command {
        CliCommand::Create {
            name,
            branch,
            new_branch,
            base,
            force,
        } => {
            let request = CreateWorktreeRequest {
                branch: branch.unwrap_or_else(|| sanitize_worktree_name(&name)),
                name,
                new_branch,
                base_branch: base,
                force,
            };
            let worktree_path = provisioner
                .create_worktree(&repo_path, &request, |progress| {
                    eprintln!("[{}] {}", progress.stage.as_str(), progress.message);
                })
                .await
                .map_err(|err| anyhow!(err.to_string()))?;

            if args.json {
                let project = Project::new(repo_path);
                let workspace = Workspace::new(
                    sanitize_worktree_name(&request.name),
                    request.branch.clone(),
                    worktree_path,
                    &project,
                );
                println!("{}", serde_json::to_string_pretty(&workspace)?);
            } else {
                println!("{}", worktree_path.display());
            }
        }
        CliCommand::Remove { name } => {
            let worktree_path = worktree_path_for(&repo_path, &sanitize_worktree_name(&name));
            provisioner
                .remove_worktree(&repo_path, &worktree_path)
                .await
                .map_err(|err| anyhow!(err.to_string()))?;
            if !args.json {
                println!("removed {}", worktree_path.display());
            }
        }
        CliCommand::List => {
            let worktrees = provisioner
                .list_worktrees(&repo_path)
                .await
                .map_err(|err| anyhow!(err.to_string()))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&worktrees)?);
            } else {
                for worktree in worktrees {
                    let branch = worktree.branch.as_deref().unwrap_or("(detached)");
                    println!("{}\t{}", worktree.path.display(), branch);
                }
            }
        }
    }

    Ok(())
}

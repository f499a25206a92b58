pub mod git;
pub mod github;
pub mod workspaces;

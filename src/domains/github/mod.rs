pub mod cli;

pub use cli::{GhCache, GithubCli};

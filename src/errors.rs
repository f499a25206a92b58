use serde::Serialize;
use std::fmt;

/// Stable machine-readable codes a caller can branch on, e.g. to offer a
/// "force replace" retry. Everything else is surfaced as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceErrorCode {
    WorktreePathExists,
    BranchCheckedOut,
    BranchAlreadyExists,
}

impl WorkspaceErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceErrorCode::WorktreePathExists => "WORKTREE_PATH_EXISTS",
            WorkspaceErrorCode::BranchCheckedOut => "BRANCH_CHECKED_OUT",
            WorkspaceErrorCode::BranchAlreadyExists => "BRANCH_ALREADY_EXISTS",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceError {
    pub code: Option<WorkspaceErrorCode>,
    pub message: String,
}

impl WorkspaceError {
    pub fn new(code: WorkspaceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code.as_str(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WorkspaceError {}

impl From<WorkspaceError> for String {
    fn from(error: WorkspaceError) -> Self {
        error.to_string()
    }
}

/// Map raw git stderr to a `WorkspaceError`. First match wins; matching is
/// case-insensitive but extraction reads the original text so refs and paths
/// keep their casing. Pure text analysis, never re-invokes git.
///
/// Git's wording shifts between versions and locales, so every pattern here
/// lives behind this single seam (see the fixture tests below).
pub fn classify_git_stderr(stderr: &str, fallback: &str) -> WorkspaceError {
    let lowered = stderr.to_lowercase();

    if lowered.contains("is already checked out") || lowered.contains("already used by worktree") {
        let message = fatal_line(stderr)
            .unwrap_or("Branch is already checked out in another worktree")
            .to_string();
        return WorkspaceError::new(WorkspaceErrorCode::BranchCheckedOut, message);
    }

    if let Some(reference) = extract_after(stderr, &lowered, "invalid reference: ") {
        return WorkspaceError::message(format!("Branch \"{reference}\" not found"));
    }

    if lowered.contains("a branch named") {
        let message = fatal_line(stderr)
            .unwrap_or("Branch already exists")
            .to_string();
        return WorkspaceError::new(WorkspaceErrorCode::BranchAlreadyExists, message);
    }

    if lowered.contains("already exists") {
        let message = fatal_line(stderr)
            .unwrap_or("Worktree path already exists")
            .to_string();
        return WorkspaceError::new(WorkspaceErrorCode::WorktreePathExists, message);
    }

    if lowered.contains("not a git repository") {
        return WorkspaceError::message("Not a git repository");
    }

    if let Some(reason) = fatal_line(stderr) {
        return WorkspaceError::message(reason);
    }

    WorkspaceError::message(fallback)
}

/// Text following `pattern` up to the end of its line. Searches the original
/// first and only falls back to the lowercased copy: lowercasing can change
/// byte lengths, so an offset found in one string must never slice the other.
fn extract_after<'a>(original: &'a str, lowered: &'a str, pattern: &str) -> Option<&'a str> {
    let (haystack, pos) = match original.find(pattern) {
        Some(pos) => (original, pos),
        None => (lowered, lowered.find(pattern)?),
    };
    haystack[pos + pattern.len()..]
        .lines()
        .next()
        .map(|line| line.trim().trim_matches('\''))
}

/// First `fatal: <reason>` line in stderr, with the prefix stripped.
fn fatal_line(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("fatal: "))
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured from git 2.43 on real collisions; the classifier is tested
    // against fixtures like these rather than live git output.
    const CHECKED_OUT: &str =
        "fatal: 'feature/login' is already checked out at '/tmp/demo-ws-one'\n";
    const ALREADY_USED: &str =
        "fatal: 'feature/login' is already used by worktree at '/tmp/demo-ws-one'\n";
    const INVALID_REF: &str = "fatal: invalid reference: no-such-branch\n";
    const BRANCH_EXISTS: &str = "fatal: a branch named 'feature/login' already exists\n";
    const PATH_EXISTS: &str = "fatal: '/tmp/demo-ws-one' already exists\n";
    const NOT_A_REPO: &str =
        "fatal: not a git repository (or any of the parent directories): .git\n";
    const UNKNOWN_FATAL: &str = "warning: something minor\nfatal: unable to access remote\n";

    #[test]
    fn classifies_checked_out_branch() {
        let err = classify_git_stderr(CHECKED_OUT, "fallback");
        assert_eq!(err.code, Some(WorkspaceErrorCode::BranchCheckedOut));
        assert!(err.message.contains("feature/login"));

        let err = classify_git_stderr(ALREADY_USED, "fallback");
        assert_eq!(err.code, Some(WorkspaceErrorCode::BranchCheckedOut));
    }

    #[test]
    fn classifies_invalid_reference_as_branch_not_found() {
        let err = classify_git_stderr(INVALID_REF, "fallback");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Branch \"no-such-branch\" not found");
    }

    #[test]
    fn classifies_invalid_reference_behind_non_ascii_noise() {
        // Hook output ahead of the fatal line may carry characters whose
        // lowercased form has a different byte length (İ lowers to i + a
        // combining dot), so offsets from the lowered copy must not be used
        // to slice the original.
        let err = classify_git_stderr("İİİinvalid reference: x", "fallback");
        assert_eq!(err.message, "Branch \"x\" not found");

        let stderr = "İstanbul deploy hook ran\nfatal: invalid reference: no-such-branch\n";
        let err = classify_git_stderr(stderr, "fallback");
        assert_eq!(err.message, "Branch \"no-such-branch\" not found");
    }

    #[test]
    fn classifies_invalid_reference_with_unexpected_casing() {
        let err = classify_git_stderr("fatal: Invalid Reference: Some-Branch\n", "fallback");
        assert_eq!(err.message, "Branch \"some-branch\" not found");
    }

    #[test]
    fn classifies_existing_branch() {
        let err = classify_git_stderr(BRANCH_EXISTS, "fallback");
        assert_eq!(err.code, Some(WorkspaceErrorCode::BranchAlreadyExists));
    }

    #[test]
    fn classifies_existing_path() {
        let err = classify_git_stderr(PATH_EXISTS, "fallback");
        assert_eq!(err.code, Some(WorkspaceErrorCode::WorktreePathExists));
        assert!(err.message.contains("/tmp/demo-ws-one"));
    }

    #[test]
    fn checked_out_wins_over_path_exists() {
        let combined = format!("{CHECKED_OUT}{PATH_EXISTS}");
        let err = classify_git_stderr(&combined, "fallback");
        assert_eq!(err.code, Some(WorkspaceErrorCode::BranchCheckedOut));
    }

    #[test]
    fn classifies_not_a_repository() {
        let err = classify_git_stderr(NOT_A_REPO, "fallback");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Not a git repository");
    }

    #[test]
    fn extracts_first_fatal_line_verbatim() {
        let err = classify_git_stderr(UNKNOWN_FATAL, "fallback");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "unable to access remote");
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let err = classify_git_stderr("error: some noise\n", "Failed to create worktree");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Failed to create worktree");

        let err = classify_git_stderr("", "Failed to create worktree");
        assert_eq!(err.message, "Failed to create worktree");
    }

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(
            WorkspaceErrorCode::WorktreePathExists.as_str(),
            "WORKTREE_PATH_EXISTS"
        );
        assert_eq!(
            WorkspaceErrorCode::BranchCheckedOut.as_str(),
            "BRANCH_CHECKED_OUT"
        );
        assert_eq!(
            WorkspaceErrorCode::BranchAlreadyExists.as_str(),
            "BRANCH_ALREADY_EXISTS"
        );
    }

    #[test]
    fn display_includes_code_when_present() {
        let err = WorkspaceError::new(WorkspaceErrorCode::BranchCheckedOut, "busy");
        assert_eq!(err.to_string(), "[BRANCH_CHECKED_OUT] busy");
        let err = WorkspaceError::message("plain");
        assert_eq!(err.to_string(), "plain");
    }
}

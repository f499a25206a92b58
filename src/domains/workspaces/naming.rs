/// Used when sanitization leaves nothing of a workspace name.
pub const FALLBACK_WORKSPACE_NAME: &str = "workspace";

const MAX_WORKTREE_NAME_LEN: usize = 80;

/// Turn arbitrary user text into a directory-name-safe workspace slug.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9_-]` into a
/// single `-`, strips leading/trailing separators and truncates to 80 chars
/// (re-stripping afterwards so the result is a fixed point). Total: any
/// input, including the empty string, yields a usable name.
pub fn sanitize_worktree_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-' {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }

    let stripped = out.trim_matches(|c| c == '-' || c == '_');
    let truncated: String = stripped.chars().take(MAX_WORKTREE_NAME_LEN).collect();
    let result = truncated.trim_matches(|c| c == '-' || c == '_');

    if result.is_empty() {
        FALLBACK_WORKSPACE_NAME.to_string()
    } else {
        result.to_string()
    }
}

/// Rewrite user text into something `git check-ref-format` would accept as a
/// branch name, or the empty string when nothing survives.
///
/// Unlike [`sanitize_worktree_name`] this keeps case and slashes; an empty
/// result is a caller-visible error rather than a silent default, since
/// provisioning onto a guessed branch would be worse than failing.
pub fn sanitize_branch_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    // Whitespace runs -> single '-'.
    let mut in_space = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }

    // Two or more dots -> '-' (covers the ".." ref-format rule).
    let mut collapsed = String::with_capacity(out.len());
    let mut dots = 0usize;
    for ch in out.chars() {
        if ch == '.' {
            dots += 1;
            continue;
        }
        match dots {
            0 => {}
            1 => collapsed.push('.'),
            _ => collapsed.push('-'),
        }
        dots = 0;
        collapsed.push(ch);
    }
    match dots {
        0 => {}
        1 => collapsed.push('.'),
        _ => collapsed.push('-'),
    }

    // Control characters and git-illegal punctuation -> '-'.
    let cleaned: String = collapsed
        .chars()
        .map(|ch| {
            if ch.is_control() || matches!(ch, '~' | '^' | ':' | '?' | '*' | '[' | ']' | '\\') {
                '-'
            } else {
                ch
            }
        })
        .collect();

    // The "@{" reflog syntax is illegal anywhere in a ref.
    let cleaned = cleaned.replace("@{", "-");

    // Collapse runs of '/' and forbid components starting with '.'.
    let mut slashed = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        if ch == '/' && slashed.ends_with('/') {
            continue;
        }
        slashed.push(ch);
    }
    let slashed = slashed.replace("/.", "/-");

    // A component may not end in ".lock".
    let delocked: String = slashed
        .split('/')
        .map(|component| match component.strip_suffix(".lock") {
            Some(stem) => format!("{stem}-lock"),
            None => component.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");

    delocked
        .trim_matches(|c| c == '.' || c == '-' || c == '/')
        .to_string()
}

use std::path::Path;

use walkdir::WalkDir;

/// Directories that never carry environment files worth copying. Skipping
/// them keeps the walk cheap in large repos.
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".venv",
    "vendor",
];

/// Copy every `.env*` file from `source` into the same relative location
/// under `dest`. Existing destination files are left untouched, so a
/// re-provisioned workspace keeps any local edits.
///
/// Best-effort by design: per-file failures are logged and skipped, and the
/// returned count only reflects files actually written.
pub fn copy_env_files(source: &Path, dest: &Path) -> usize {
    let mut copied = 0usize;

    let walker = WalkDir::new(source).into_iter().filter_entry(|entry| {
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            !SKIP_DIRS.contains(&name.as_ref())
        } else {
            true
        }
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("Skipping unreadable entry during env copy: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.starts_with(".env") {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);
        if target.exists() {
            log::debug!("Not overwriting existing {}", target.display());
            continue;
        }

        if let Some(parent) = target.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                log::debug!("Could not create {}: {err}", parent.display());
                continue;
            }
        }
        match std::fs::copy(entry.path(), &target) {
            Ok(_) => {
                log::debug!("Copied {} -> {}", entry.path().display(), target.display());
                copied += 1;
            }
            Err(err) => {
                log::debug!("Could not copy {}: {err}", entry.path().display());
            }
        }
    }

    copied
}

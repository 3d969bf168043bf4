//! Where runtime files live.
//!
//! `controller/` is a workspace member. The game store, payout log and `.env`
//! normally sit in the workspace root one level up; in a container they sit in
//! the working directory instead, which always wins when it has the file.

use std::path::{Path, PathBuf};

/// The `controller/` crate directory, fixed at compile time.
pub fn controller_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Parent of `controller/`, falling back to the crate dir itself.
pub fn workspace_root() -> PathBuf {
    let dir = controller_dir();
    dir.parent().map(Path::to_path_buf).unwrap_or(dir)
}

/// Path for a workspace-level file. The cwd copy is used when it exists or
/// when there is no workspace copy either (so new files land next to the
/// process).
pub fn resolve_workspace_file<P: AsRef<Path>>(rel: P) -> PathBuf {
    let rel = rel.as_ref();
    let in_root = workspace_root().join(rel);
    match std::env::current_dir() {
        Ok(cwd) => {
            let in_cwd = cwd.join(rel);
            if in_cwd.exists() || !in_root.exists() {
                in_cwd
            } else {
                in_root
            }
        }
        Err(_) => in_root,
    }
}

/// Resolve a path typed by the user (env var). Absolute paths are kept;
/// relative ones are tried against cwd, then the workspace root, and kept
/// relative to cwd if neither has the file yet.
pub fn resolve_user_path<P: AsRef<Path>>(p: P) -> PathBuf {
    let p = p.as_ref();
    if p.is_absolute() || p.exists() {
        return p.to_path_buf();
    }
    let in_root = workspace_root().join(p);
    if in_root.exists() {
        return in_root;
    }
    p.to_path_buf()
}

/// Load the first `.env` found in cwd, its parent, the workspace root or the
/// crate dir. Runs at most once per process.
pub fn load_dotenv() {
    static ONCE: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    ONCE.get_or_init(|| {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(".env"));
            if let Some(parent) = cwd.parent() {
                candidates.push(parent.join(".env"));
            }
        }
        candidates.push(workspace_root().join(".env"));
        candidates.push(controller_dir().join(".env"));

        for p in candidates {
            if p.exists() && dotenvy::from_path(&p).is_ok() {
                tracing::debug!("Loaded .env from {}", p.display());
                return;
            }
        }
        let _ = dotenvy::dotenv();
    });
}

use std::path::{Path, PathBuf};

/// Resolve the canonical image path.
///
/// Relative paths are anchored at the process working directory, so the
/// file the session reports is the one later reads pick up even if a
/// collaborator changes directory.
pub(crate) fn resolve_image_path(configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        return configured.to_path_buf();
    }

    match std::env::current_dir() {
        Ok(dir) => dir.join(configured),
        Err(err) => {
            log::warn!("Failed to resolve working directory: {err}");
            configured.to_path_buf()
        }
    }
}

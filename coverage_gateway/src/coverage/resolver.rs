use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{
    config::ActiveClassPath,
    error::{CoverageError, CoverageResult},
    probe::contains_class_file,
};

/// Returns the first candidate that is a directory holding at least one
/// `.class` file somewhere below it.
pub fn first_qualifying(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|candidate| qualifies(candidate))
}

/// Points `active` at the first qualifying candidate.
///
/// `active` is left untouched when nothing qualifies.
pub fn resolve_class_path(
    candidates: &[PathBuf],
    active: &ActiveClassPath,
) -> CoverageResult<PathBuf> {
    let Some(chosen) = first_qualifying(candidates) else {
        return Err(CoverageError::ClassPathNotFound {
            checked: candidates.to_vec(),
        });
    };

    let chosen = chosen.to_path_buf();
    let previous = active.replace(chosen.clone());
    info!(
        class_path = %chosen.display(),
        previous = %previous.display(),
        "Active class path resolved",
    );
    Ok(chosen)
}

fn qualifies(candidate: &Path) -> bool {
    if !candidate.is_dir() {
        return false;
    }

    match contains_class_file(candidate) {
        Ok(found) => found,
        Err(err) => {
            warn!(
                path = %candidate.display(),
                error = %err,
                "Skipping class path candidate after walk error",
            );
            false
        }
    }
}

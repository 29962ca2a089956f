use crate::error::RenameError;
use crate::planner::RenamePlan;
use crate::sequence::is_protected;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Renamed,
    Unchanged,
}

/// Performs one planned rename. Never overwrites an existing file.
pub fn apply_rename(plan: &RenamePlan) -> Result<ApplyResult, RenameError> {
    if !plan.changed || plan.source == plan.destination {
        return Ok(ApplyResult::Unchanged);
    }

    if is_protected(&plan.source) || is_protected(&plan.destination) {
        return Err(RenameError::PerFile {
            path: plan.source.clone(),
            reason: "protected file names are never renamed".to_string(),
        });
    }

    if plan.destination.exists() {
        return Err(RenameError::Filesystem {
            from: plan.source.clone(),
            to: plan.destination.clone(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        });
    }

    fs::rename(&plan.source, &plan.destination).map_err(|err| rename_error(plan, err))?;

    Ok(ApplyResult::Renamed)
}

/// A rename refused for permissions means the directory is not writable.
fn rename_error(plan: &RenamePlan, err: io::Error) -> RenameError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return RenameError::Fatal(format!(
            "permission denied renaming {} to {}: {}",
            plan.source.display(),
            plan.destination.display(),
            err
        ));
    }
    RenameError::Filesystem {
        from: plan.source.clone(),
        to: plan.destination.clone(),
        source: err,
    }
}

/// A destination directory the process cannot write to ends the whole run.
pub fn ensure_writable_dir(dir: &Path) -> Result<(), RenameError> {
    let meta = fs::metadata(dir).map_err(|err| {
        RenameError::Fatal(format!("cannot access directory {}: {}", dir.display(), err))
    })?;
    if !meta.is_dir() {
        return Err(RenameError::Fatal(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(RenameError::Fatal(format!(
            "directory is not writable: {}",
            dir.display()
        )));
    }

    // Mode bits alone miss ownership and ACLs; try an actual write.
    tempfile::Builder::new()
        .prefix(".smart-image-renamer-")
        .tempfile_in(dir)
        .map_err(|err| {
            RenameError::Fatal(format!("directory is not writable: {}: {}", dir.display(), err))
        })?;
    Ok(())
}

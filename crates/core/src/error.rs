use crate::template::TemplateError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a metadata adapter for a single file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt EXIF data in {path}: {source}")]
    Exif {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },
    #[error("cannot read media container {path}: {source}")]
    Container {
        path: PathBuf,
        #[source]
        source: nom_exif::Error,
    },
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("invalid format string: {0}")]
    Configuration(#[from] TemplateError),
    #[error("skipping {path}: {reason}")]
    PerFile { path: PathBuf, reason: String },
    #[error("failed to rename {from} -> {to}: {source}")]
    Filesystem {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Fatal(String),
}

impl RenameError {
    /// Fatal errors end the whole run; everything else only skips one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenameError::Configuration(_) | RenameError::Fatal(_))
    }
}

impl From<ExtractError> for RenameError {
    fn from(err: ExtractError) -> Self {
        let path = match &err {
            ExtractError::Io { path, .. }
            | ExtractError::Exif { path, .. }
            | ExtractError::Container { path, .. } => path.clone(),
        };
        RenameError::PerFile {
            path,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_and_fatal_errors_abort() {
        assert!(RenameError::Configuration(TemplateError::Empty).is_fatal());
        assert!(RenameError::Fatal("input path does not exist".to_string()).is_fatal());
        assert!(!RenameError::PerFile {
            path: PathBuf::from("a.jpg"),
            reason: "unreadable".to_string(),
        }
        .is_fatal());
        assert!(!RenameError::Filesystem {
            from: PathBuf::from("a.jpg"),
            to: PathBuf::from("b.jpg"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .is_fatal());
    }

    #[test]
    fn extract_error_becomes_per_file_error() {
        let err: RenameError = ExtractError::Io {
            path: PathBuf::from("broken.jpg"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        }
        .into();
        match err {
            RenameError::PerFile { path, reason } => {
                assert_eq!(path, PathBuf::from("broken.jpg"));
                assert!(reason.contains("broken.jpg"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

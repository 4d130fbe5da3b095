//! Rename Errors

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Workflow stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rewrite,
    Restructure,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rewrite => "rewrite",
            Stage::Restructure => "restructure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the rewrite and restructure passes
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source root missing: {path}")]
    MissingSourceRoot { path: PathBuf },

    #[error("destination already exists: {path}")]
    Collision { path: PathBuf },

    #[error(
        "move into {destination} stopped at {failed}: {source}; already moved: {}",
        format_moved(.moved)
    )]
    PartialMove {
        destination: PathBuf,
        moved: Vec<PathBuf>,
        failed: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package identifier: {0}")]
    InvalidIdentifier(String),
}

impl RenameError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        RenameError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Primary path the error refers to
    pub fn path(&self) -> Option<&Path> {
        match self {
            RenameError::Io { path, .. }
            | RenameError::MissingSourceRoot { path }
            | RenameError::Collision { path } => Some(path),
            RenameError::PartialMove { failed, .. } => Some(failed),
            RenameError::InvalidIdentifier(_) => None,
        }
    }
}

fn format_moved(moved: &[PathBuf]) -> String {
    moved
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A failed rename workflow: the stage it stopped in and why
#[derive(Debug, Error)]
#[error("rename failed during {stage}: {cause}")]
pub struct WorkflowFailure {
    pub stage: Stage,
    #[source]
    pub cause: RenameError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_move_lists_moved_entries() {
        let err = RenameError::PartialMove {
            destination: PathBuf::from("java/com/new"),
            moved: vec![PathBuf::from("java/com/new/A.java"), PathBuf::from("java/com/new/B.java")],
            failed: PathBuf::from("java/com/old/C.java"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let message = err.to_string();
        assert!(message.contains("java/com/new/A.java, java/com/new/B.java"));
        assert!(message.contains("java/com/old/C.java"));
        assert_eq!(err.path(), Some(Path::new("java/com/old/C.java")));
    }

    #[test]
    fn test_workflow_failure_names_stage() {
        let failure = WorkflowFailure {
            stage: Stage::Restructure,
            cause: RenameError::Collision { path: PathBuf::from("java/com/new/App.java") },
        };
        assert_eq!(
            failure.to_string(),
            "rename failed during restructure: destination already exists: java/com/new/App.java"
        );
    }
}

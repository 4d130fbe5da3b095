//! Source Tree Traversal
//!
//! Depth-first, file-name ordered walk over a module directory. Which
//! top-level directories to leave out is a walker parameter; what to do with
//! each entry is up to the `TreeVisitor`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::RenameError;

/// Callbacks invoked for every entry below the walk root
pub trait TreeVisitor {
    /// Called before the directory's children are visited
    fn visit_dir(&mut self, _path: &Path, _depth: usize) -> Result<(), RenameError> {
        Ok(())
    }

    /// Called for every regular file
    fn visit_file(&mut self, path: &Path, depth: usize) -> Result<(), RenameError>;
}

/// Deterministic depth-first walker
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    skip_dirs: Vec<String>,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_dirs: Vec::new(),
        }
    }

    /// Leave out these directories when they sit directly under the root
    pub fn skip_dirs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.skip_dirs = names.iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, stopping at the first visitor or I/O error.
    /// Symbolic links are neither followed nor reported.
    pub fn walk<V: TreeVisitor>(&self, visitor: &mut V) -> Result<(), RenameError> {
        let entries = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in entries {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                RenameError::Io { path, source: err.into() }
            })?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                visitor.visit_dir(entry.path(), entry.depth())?;
            } else if file_type.is_file() {
                visitor.visit_file(entry.path(), entry.depth())?;
            }
        }

        Ok(())
    }

    fn is_skipped(&self, entry: &walkdir::DirEntry) -> bool {
        entry.depth() == 1
            && entry.file_type().is_dir()
            && self.skip_dirs.iter().any(|name| entry.file_name() == name.as_str())
    }
}

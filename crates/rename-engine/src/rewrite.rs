//! Text Rewrite Pass
//!
//! Replaces the old package name, in both its forward (`com.example.app`) and
//! reversed (`app.example.com`) forms, inside every allow-listed file of the
//! module. Each file is rewritten through a temporary sibling that is renamed
//! over the original, so a crash never leaves a half-written source file.
//!
//! Files are rewritten independently. If a later file fails, files rewritten
//! before it keep the new package name; there is no cross-file rollback.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::RenameError;
use crate::operation::RenameOperation;
use crate::walker::{TreeVisitor, TreeWalker};
use crate::{DEFAULT_EXTENSIONS, DEFAULT_SKIP_DIRS};

/// Result of a rewrite pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Allow-listed files that were read
    pub files_scanned: usize,
    /// Files whose contents changed, in visit order
    pub rewritten: Vec<PathBuf>,
}

/// Rewrites package references below a module directory
pub struct RewritePass<'a> {
    operation: &'a RenameOperation,
    extensions: Vec<String>,
    skip_dirs: Vec<String>,
}

impl<'a> RewritePass<'a> {
    pub fn new(operation: &'a RenameOperation) -> Self {
        Self {
            operation,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Replace the extension allow-list
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    /// Replace the top-level skip-list
    pub fn with_skip_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        self.skip_dirs = dirs.iter().map(|d| d.as_ref().to_string()).collect();
        self
    }

    /// Rewrite every allow-listed file below `module_dir`
    pub fn run(&self, module_dir: &Path) -> Result<RewriteReport, RenameError> {
        if self.operation.is_identity() {
            return Ok(RewriteReport::default());
        }

        info!(
            "Rewriting references to {} under {:?}",
            self.operation.old, module_dir
        );

        let mut visitor = RewriteVisitor {
            substitution: Substitution::new(self.operation)?,
            extensions: &self.extensions,
            report: RewriteReport::default(),
        };

        TreeWalker::new(module_dir)
            .skip_dirs(&self.skip_dirs)
            .walk(&mut visitor)?;

        info!(
            "Rewrote {} of {} source files",
            visitor.report.rewritten.len(),
            visitor.report.files_scanned
        );
        Ok(visitor.report)
    }
}

/// Single-pass substitution of both identifier forms.
///
/// Matching both literals in one left-to-right scan keeps the result
/// independent of substitution order, even when the new forward form equals
/// the old reversed form.
struct Substitution {
    pattern: Regex,
    old_forward: String,
    new_forward: String,
    new_reversed: String,
}

impl Substitution {
    fn new(operation: &RenameOperation) -> Result<Self, RenameError> {
        let old_forward = operation.old.to_string();
        let pattern = format!(
            "{}|{}",
            regex::escape(&old_forward),
            regex::escape(&operation.reversed_old)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| RenameError::InvalidIdentifier(format!("{}: {}", old_forward, e)))?;

        Ok(Self {
            pattern,
            old_forward,
            new_forward: operation.new.to_string(),
            new_reversed: operation.reversed_new.clone(),
        })
    }

    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, |caps: &Captures| {
            if caps[0] == self.old_forward {
                self.new_forward.clone()
            } else {
                self.new_reversed.clone()
            }
        })
    }
}

struct RewriteVisitor<'a> {
    substitution: Substitution,
    extensions: &'a [String],
    report: RewriteReport,
}

impl RewriteVisitor<'_> {
    fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }
}

impl TreeVisitor for RewriteVisitor<'_> {
    fn visit_dir(&mut self, path: &Path, depth: usize) -> Result<(), RenameError> {
        debug!("{}Folder [{}]", indent(depth), display_name(path));
        Ok(())
    }

    fn visit_file(&mut self, path: &Path, depth: usize) -> Result<(), RenameError> {
        if !self.is_allowed(path) {
            return Ok(());
        }

        self.report.files_scanned += 1;
        let text = fs::read_to_string(path).map_err(|e| RenameError::io(path, e))?;

        if let Cow::Owned(updated) = self.substitution.apply(&text) {
            debug!("{}File [{}] rewritten", indent(depth), display_name(path));
            write_atomically(path, &updated)?;
            self.report.rewritten.push(path.to_path_buf());
        }

        Ok(())
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory
fn write_atomically(path: &Path, contents: &str) -> Result<(), RenameError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)
        .map_err(|e| RenameError::io(path, e))?
        .permissions();

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| RenameError::io(path, e))?;
    temp.write_all(contents.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| RenameError::io(path, e))?;
    fs::set_permissions(temp.path(), permissions).map_err(|e| RenameError::io(path, e))?;

    temp.persist(path).map_err(|e| RenameError::io(path, e.error))?;
    Ok(())
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth.saturating_sub(1))
}

fn display_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy())
}

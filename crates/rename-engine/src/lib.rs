//! Package Rename Engine
//!
//! Renames the Java package of an Android application module in two passes:
//! a text rewrite over the module's sources and build scripts, followed by a
//! restructure that moves the package directories of every source set.

pub mod error;
pub mod operation;
pub mod walker;
pub mod rewrite;
pub mod restructure;
pub mod workflow;

pub use error::{RenameError, Stage, WorkflowFailure};
pub use operation::{RenameOperation, SourceLayout, SourceSet};
pub use walker::{TreeVisitor, TreeWalker};
pub use rewrite::{RewritePass, RewriteReport};
pub use restructure::{RestructurePass, RestructureReport};
pub use workflow::{RenameOutcome, RenameState, RenameWorkflow};

use std::path::Path;
use droid_release_core::PackageIdentifier;

/// Directories under the module root that hold generated output
pub const DEFAULT_SKIP_DIRS: &[&str] = &["build", "release"];

/// File extensions whose contents are rewritten
pub const DEFAULT_EXTENSIONS: &[&str] = &["xml", "java", "kt", "gradle", "kts"];

/// Rename `old` to `new` in the project at `application_root` using the
/// standard `app` module layout.
pub fn rename_package(
    application_root: &Path,
    old: &PackageIdentifier,
    new: &PackageIdentifier,
) -> Result<RenameOutcome, WorkflowFailure> {
    let operation = RenameOperation::new(application_root, old.clone(), new.clone());
    RenameWorkflow::new(operation, SourceLayout::default()).run()
}

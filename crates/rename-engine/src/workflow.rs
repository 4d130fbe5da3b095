//! Rename Workflow
//!
//! Sequences the rewrite pass and the restructure pass for one rename:
//!
//! ```text
//! Idle -> Rewriting -> Restructuring -> Done
//!            |              |
//!            +--> Failed <--+
//! ```
//!
//! There is no retry and no rollback. If restructuring fails, the sources
//! already name the new package while the directories keep the old layout;
//! the failure reports what was moved so the rest can be finished by hand.

use std::fmt;
use std::sync::Arc;

use droid_release_core::{ProgressSink, Severity, TracingSink};
use tracing::debug;

use crate::error::{RenameError, Stage, WorkflowFailure};
use crate::operation::{RenameOperation, SourceLayout};
use crate::restructure::{RestructurePass, RestructureReport};
use crate::rewrite::{RewritePass, RewriteReport};
use crate::{DEFAULT_EXTENSIONS, DEFAULT_SKIP_DIRS};

/// Workflow state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameState {
    Idle,
    Rewriting,
    Restructuring,
    Done,
    Failed { stage: Stage, message: String },
}

impl fmt::Display for RenameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenameState::Idle => f.write_str("idle"),
            RenameState::Rewriting => f.write_str("rewriting"),
            RenameState::Restructuring => f.write_str("restructuring"),
            RenameState::Done => f.write_str("done"),
            RenameState::Failed { stage, .. } => write!(f, "failed ({})", stage),
        }
    }
}

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    /// True when old and new package were equal and nothing was touched
    pub unchanged: bool,
    pub rewrite: RewriteReport,
    pub restructure: RestructureReport,
}

/// One package rename, run once from `Idle`
pub struct RenameWorkflow {
    operation: RenameOperation,
    layout: SourceLayout,
    extensions: Vec<String>,
    skip_dirs: Vec<String>,
    sink: Arc<dyn ProgressSink>,
    state: RenameState,
}

impl RenameWorkflow {
    pub fn new(operation: RenameOperation, layout: SourceLayout) -> Self {
        Self {
            operation,
            layout,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect(),
            sink: Arc::new(TracingSink),
            state: RenameState::Idle,
        }
    }

    /// Report progress to `sink` instead of the tracing log
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    pub fn with_skip_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        self.skip_dirs = dirs.iter().map(|d| d.as_ref().to_string()).collect();
        self
    }

    pub fn state(&self) -> &RenameState {
        &self.state
    }

    pub fn operation(&self) -> &RenameOperation {
        &self.operation
    }

    /// Run both passes. Each call starts over from `Idle`.
    pub fn run(&mut self) -> Result<RenameOutcome, WorkflowFailure> {
        self.state = RenameState::Idle;

        if self.operation.is_identity() {
            self.sink.info(&format!(
                "Package name is already {}, nothing to rename",
                self.operation.new
            ));
            self.transition(RenameState::Done);
            return Ok(RenameOutcome {
                unchanged: true,
                ..Default::default()
            });
        }

        self.sink.info(&format!(
            "Refactoring application package name {} -> {}",
            self.operation.old, self.operation.new
        ));

        self.transition(RenameState::Rewriting);
        let module_dir = self.layout.module_dir(&self.operation.tree_root);
        let rewrite = RewritePass::new(&self.operation)
            .with_extensions(&self.extensions)
            .with_skip_dirs(&self.skip_dirs)
            .run(&module_dir);
        let rewrite = match rewrite {
            Ok(report) => report,
            Err(cause) => return Err(self.fail(Stage::Rewrite, cause)),
        };
        self.sink.emit(
            Severity::Debug,
            &format!("Rewrote {} files", rewrite.rewritten.len()),
        );

        self.transition(RenameState::Restructuring);
        let restructure = RestructurePass::new(&self.operation, &self.layout).run();
        let restructure = match restructure {
            Ok(report) => report,
            Err(cause) => return Err(self.fail(Stage::Restructure, cause)),
        };

        self.transition(RenameState::Done);
        self.sink.success(&format!("Package renamed to {}", self.operation.new));

        Ok(RenameOutcome {
            unchanged: false,
            rewrite,
            restructure,
        })
    }

    fn transition(&mut self, next: RenameState) {
        debug!("rename workflow: {} -> {}", self.state, next);
        self.sink.emit(Severity::Debug, &format!("rename: {}", next));
        self.state = next;
    }

    fn fail(&mut self, stage: Stage, cause: RenameError) -> WorkflowFailure {
        self.transition(RenameState::Failed {
            stage,
            message: cause.to_string(),
        });
        self.sink.error(&format!("Rename failed during {}: {}", stage, cause));

        if stage == Stage::Restructure {
            self.sink.warn(&format!(
                "Sources already reference {} but package directories still use the {} layout",
                self.operation.new, self.operation.old
            ));
        }

        WorkflowFailure { stage, cause }
    }
}

//! Directory Restructure Pass
//!
//! Moves the package directory of every source set from the old package path
//! to the new one and removes what is left of the old layout.
//!
//! This pass is destructive. It must run after the rewrite pass, which
//! discovers files through the old layout.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::RenameError;
use crate::operation::{RenameOperation, SourceLayout, SourceSet};

/// Result of a restructure pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestructureReport {
    /// Source sets whose package directory was moved
    pub moved_source_sets: Vec<String>,
    /// Optional source sets that had no old package directory
    pub skipped_source_sets: Vec<String>,
    /// New locations of every moved entry
    pub moved: Vec<PathBuf>,
}

/// Moves package directories for each source set in a layout
pub struct RestructurePass<'a> {
    operation: &'a RenameOperation,
    layout: &'a SourceLayout,
}

/// One source set's checked move
#[derive(Debug)]
struct MovePlan {
    source_set: String,
    source_root: PathBuf,
    old_dir: PathBuf,
    new_dir: PathBuf,
    children: Vec<OsString>,
    /// Directory on the old path that a moved child replaces, and where it
    /// is set aside first. Only when the new package is an ancestor of the old one.
    set_aside: Option<(PathBuf, PathBuf)>,
}

impl<'a> RestructurePass<'a> {
    pub fn new(operation: &'a RenameOperation, layout: &'a SourceLayout) -> Self {
        Self { operation, layout }
    }

    /// Every source set is checked before the first entry moves, so a
    /// collision anywhere leaves the whole tree untouched.
    pub fn run(&self) -> Result<RestructureReport, RenameError> {
        let mut report = RestructureReport::default();
        if self.operation.is_identity() {
            return Ok(report);
        }

        info!("Generating new folder structure...");

        let mut plans = Vec::new();
        for source_set in &self.layout.source_sets {
            match self.plan(source_set)? {
                Some(plan) => plans.push(plan),
                None => report.skipped_source_sets.push(source_set.name.clone()),
            }
        }

        for plan in plans {
            self.execute(&plan, &mut report.moved)?;
            report.moved_source_sets.push(plan.source_set);
        }

        Ok(report)
    }

    fn plan(&self, source_set: &SourceSet) -> Result<Option<MovePlan>, RenameError> {
        let source_root = self.layout.source_root(&self.operation.tree_root, source_set);
        let old_dir = source_root.join(self.operation.old.relative_path());
        let new_dir = source_root.join(self.operation.new.relative_path());

        if let Some(missing) = [&source_root, &old_dir].into_iter().find(|p| !p.is_dir()) {
            if source_set.required {
                return Err(RenameError::MissingSourceRoot { path: missing.clone() });
            }
            debug!("Skipping source set {}: {:?} does not exist", source_set.name, missing);
            return Ok(None);
        }

        // When the new package nests inside the old one, the first directory
        // on the new path is created inside `old_dir` and must stay there.
        if let Some(entry) = first_component_below(&new_dir, &old_dir) {
            let path = old_dir.join(entry);
            if exists(&path) {
                return Err(RenameError::Collision { path });
            }
        }

        // When the old package nests inside the new one, the first directory
        // on the old path is what an equally named child would land on.
        let on_old_path = first_component_below(&old_dir, &new_dir).map(|entry| new_dir.join(entry));

        let children = list_children(&old_dir)?;
        let mut set_aside = None;
        for name in &children {
            let target = new_dir.join(name);
            if on_old_path.as_ref() == Some(&target) {
                if has_entries_besides(&target, &old_dir)? {
                    return Err(RenameError::Collision { path: target });
                }
                let mut aside_name = OsString::from(".");
                aside_name.push(name);
                aside_name.push(".renaming");
                let aside = new_dir.join(aside_name);
                if exists(&aside) {
                    return Err(RenameError::Collision { path: aside });
                }
                set_aside = Some((target, aside));
            } else if exists(&target) {
                return Err(RenameError::Collision { path: target });
            }
        }

        Ok(Some(MovePlan {
            source_set: source_set.name.clone(),
            source_root,
            old_dir,
            new_dir,
            children,
            set_aside,
        }))
    }

    /// Move a planned source set. `moved` collects entries across source
    /// sets so a failure reports everything already moved.
    fn execute(&self, plan: &MovePlan, moved: &mut Vec<PathBuf>) -> Result<(), RenameError> {
        let new_dir = &plan.new_dir;
        let mut old_dir = plan.old_dir.clone();

        if let Some((on_path, aside)) = &plan.set_aside {
            fs::rename(on_path, aside).map_err(|e| move_failure(moved, new_dir, on_path, e))?;
            debug!("Set aside {:?} as {:?}", on_path, aside);
            if let Ok(rest) = plan.old_dir.strip_prefix(on_path) {
                old_dir = aside.join(rest);
            }
        }

        fs::create_dir_all(new_dir).map_err(|e| move_failure(moved, new_dir, new_dir, e))?;

        let before = moved.len();
        for name in &plan.children {
            let from = old_dir.join(name);
            let to = new_dir.join(name);
            fs::rename(&from, &to).map_err(|e| move_failure(moved, new_dir, &from, e))?;
            debug!("Moved {:?} -> {:?}", from, to);
            moved.push(to);
        }

        self.remove_old_layout(&plan.source_root, &old_dir, new_dir)?;

        info!(
            "[{}] moved {} entries to {:?}",
            plan.source_set,
            moved.len() - before,
            new_dir
        );
        Ok(())
    }

    /// Delete the old first-segment directory, unless the new package lives
    /// under it too; then only the emptied old directories are pruned.
    fn remove_old_layout(&self, source_root: &Path, old_dir: &Path, new_dir: &Path) -> Result<(), RenameError> {
        let old_top = source_root.join(self.operation.old.first_segment());

        if !new_dir.starts_with(&old_top) {
            if old_top != old_dir && has_entries_besides(&old_top, old_dir)? {
                warn!("Removing {:?} along with the unrelated entries it still contains", old_top);
            }
            return fs::remove_dir_all(&old_top).map_err(|e| RenameError::io(&old_top, e));
        }

        let mut current = old_dir.to_path_buf();
        while current != source_root && !new_dir.starts_with(&current) {
            if !list_children(&current)?.is_empty() {
                break;
            }
            fs::remove_dir(&current).map_err(|e| RenameError::io(&current, e))?;
            debug!("Removed empty directory {:?}", current);
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        Ok(())
    }
}

/// `Io` when nothing has moved yet, otherwise `PartialMove` listing what did
fn move_failure(moved: &[PathBuf], destination: &Path, failed: &Path, source: std::io::Error) -> RenameError {
    if moved.is_empty() {
        return RenameError::io(failed, source);
    }
    RenameError::PartialMove {
        destination: destination.to_path_buf(),
        moved: moved.to_vec(),
        failed: failed.to_path_buf(),
        source,
    }
}

/// First path component of `path` below `ancestor`, if `path` is strictly below it
fn first_component_below(path: &Path, ancestor: &Path) -> Option<OsString> {
    path.strip_prefix(ancestor)
        .ok()
        .and_then(|rest| rest.components().next())
        .map(|c| c.as_os_str().to_os_string())
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Direct children of a directory, sorted by name
fn list_children(dir: &Path) -> Result<Vec<OsString>, RenameError> {
    let mut names = fs::read_dir(dir)
        .map_err(|e| RenameError::io(dir, e))?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RenameError::io(dir, e))?;
    names.sort();
    Ok(names)
}

/// Whether the directories from `top` down to `old_dir` hold anything
/// besides the next directory on that chain. `old_dir` itself is not inspected.
fn has_entries_besides(top: &Path, old_dir: &Path) -> Result<bool, RenameError> {
    let mut current = top.to_path_buf();
    while current != old_dir {
        let children = list_children(&current)?;
        let Some(next) = first_component_below(old_dir, &current) else {
            return Ok(!children.is_empty());
        };
        if children.iter().any(|c| *c != next) {
            return Ok(true);
        }
        current.push(next);
    }
    Ok(false)
}

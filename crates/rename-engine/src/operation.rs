//! Rename Operation and Source Layout

use std::path::{Path, PathBuf};

use droid_release_core::PackageIdentifier;

/// One package rename request, built once and consumed by both passes
#[derive(Debug, Clone)]
pub struct RenameOperation {
    pub old: PackageIdentifier,
    pub new: PackageIdentifier,
    pub reversed_old: String,
    pub reversed_new: String,
    /// Gradle project root (the directory holding the application module)
    pub tree_root: PathBuf,
}

impl RenameOperation {
    pub fn new(tree_root: &Path, old: PackageIdentifier, new: PackageIdentifier) -> Self {
        Self {
            reversed_old: old.reversed(),
            reversed_new: new.reversed(),
            old,
            new,
            tree_root: tree_root.to_path_buf(),
        }
    }

    /// Renaming a package to itself changes nothing
    pub fn is_identity(&self) -> bool {
        self.old == self.new
    }
}

/// A named source set (`main`, `test`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub name: String,
    /// Whether a missing source root is an error rather than a skip
    pub required: bool,
}

impl SourceSet {
    pub fn required(name: &str) -> Self {
        Self { name: name.to_string(), required: true }
    }

    pub fn optional(name: &str) -> Self {
        Self { name: name.to_string(), required: false }
    }
}

/// Where an application module keeps its sources
#[derive(Debug, Clone)]
pub struct SourceLayout {
    /// Module directory under the project root
    pub module: String,
    /// Language directory inside each source set
    pub language_dir: String,
    pub source_sets: Vec<SourceSet>,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            module: "app".to_string(),
            language_dir: "java".to_string(),
            source_sets: vec![
                SourceSet::required("main"),
                SourceSet::optional("androidTest"),
                SourceSet::optional("test"),
            ],
        }
    }
}

impl SourceLayout {
    /// Layout for a module other than `app`
    pub fn for_module(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Self::default()
        }
    }

    /// Module directory for a project root
    pub fn module_dir(&self, tree_root: &Path) -> PathBuf {
        tree_root.join(&self.module)
    }

    /// `<root>/<module>/src/<set>/<language>`
    pub fn source_root(&self, tree_root: &Path, source_set: &SourceSet) -> PathBuf {
        self.module_dir(tree_root)
            .join("src")
            .join(&source_set.name)
            .join(&self.language_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_precomputes_reversed_forms() {
        let op = RenameOperation::new(
            Path::new("/project"),
            "com.old".parse().unwrap(),
            "com.new.app".parse().unwrap(),
        );
        assert_eq!(op.reversed_old, "old.com");
        assert_eq!(op.reversed_new, "app.new.com");
        assert!(!op.is_identity());
    }

    #[test]
    fn test_default_layout_paths() {
        let layout = SourceLayout::default();
        let root = layout.source_root(Path::new("/project"), &layout.source_sets[1]);
        assert_eq!(root, PathBuf::from("/project/app/src/androidTest/java"));
        assert!(layout.source_sets[0].required);
        assert!(!layout.source_sets[2].required);
    }
}

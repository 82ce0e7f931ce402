//! Bounded repository scan for build descriptors
//!
//! Repositories in the wild nest vendored copies of other projects, commit
//! build output, and gitignore entire module trees. The scan therefore walks
//! everything (no gitignore semantics) but prunes version-control, build
//! output and dependency-cache subtrees, which both bounds the cost and
//! avoids false aggregator hits inside vendored code.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directory names never descended into.
const PRUNED_DIRS: &[&str] = &[
    ".git",
    "target",
    "build",
    "out",
    "node_modules",
    ".gradle",
    ".idea",
];

#[derive(Debug, Default, Clone)]
pub struct RepoScanner;

impl RepoScanner {
    pub fn new() -> Self {
        Self
    }

    /// All files under `repo_root` whose name is one of `names`, excluding
    /// pruned subtrees. Order is the walker's directory order.
    pub fn find_all(&self, repo_root: &Path, names: &[&str]) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(repo_root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !PRUNED_DIRS.contains(&name))
                    .unwrap_or(true)
            })
            .build();

        let mut out = Vec::new();
        for entry in walker.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if names.contains(&name) {
                    out.push(entry.into_path());
                }
            }
        }
        out
    }
}

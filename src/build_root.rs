//! Build-root and module discovery
//!
//! Given a starting path inside a cloned repository, finds the nearest
//! enclosing build descriptor and, for Maven, the best aggregator descriptor
//! so reactor-relative builds are possible. Ancestor walks are always tried
//! before the repository-wide scan: the nearest descriptor is almost always
//! the right module, and the scan is only a fallback for requests whose class
//! file no longer exists at the recorded path.

use crate::error::BuildError;
use crate::model::BuildTool;
use crate::scan::RepoScanner;
use std::fs;
use std::path::{Path, PathBuf};

const GRADLE_BUILD_FILES: &[&str] = &["build.gradle", "build.gradle.kts"];
const GRADLE_SETTINGS_FILES: &[&str] = &["settings.gradle", "settings.gradle.kts"];

#[derive(Debug, Default, Clone)]
pub struct BuildRootDetector {
    scanner: RepoScanner,
}

impl BuildRootDetector {
    pub fn new(scanner: RepoScanner) -> Self {
        Self { scanner }
    }

    /// True when the pom declares nested modules, i.e. is an aggregator.
    /// Substring check on purpose: descriptor XML in the wild is frequently
    /// malformed enough to defeat strict parsing.
    pub fn pom_has_modules(pom: &Path) -> bool {
        match fs::read_to_string(pom) {
            Ok(txt) => txt.contains("<modules>") && txt.contains("<module>"),
            Err(_) => false,
        }
    }

    /// The best reactor-root candidate: ancestor poms of `scope_dir` when
    /// given, otherwise every pom in the repository; ranked by an aggregator
    /// bonus, then shallowness. May return the module's own pom, which means
    /// "no distinct reactor" (standalone build only), not an error.
    pub fn pick_best_pom(&self, repo_root: &Path, scope_dir: Option<&Path>) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();

        if let Some(scope) = scope_dir {
            for dir in ancestors_within(scope, repo_root) {
                let pom = dir.join("pom.xml");
                if pom.is_file() {
                    candidates.push(pom);
                }
            }
        }

        if candidates.is_empty() {
            candidates = self.scanner.find_all(repo_root, &["pom.xml"]);
        }
        if candidates.is_empty() {
            return None;
        }

        candidates.sort();
        candidates.dedup();
        candidates.sort_by_key(|pom| {
            let depth = pom
                .strip_prefix(repo_root)
                .map(|rel| rel.components().count() as i64)
                .unwrap_or(i64::MAX);
            let bonus = if Self::pom_has_modules(pom) { -1000 } else { 0 };
            depth + bonus
        });
        candidates.into_iter().next()
    }

    /// Nearest ancestor pom of `module_dir`, bounded by the repository root.
    pub fn pick_module_pom(&self, module_dir: &Path, repo_root: &Path) -> Option<PathBuf> {
        for dir in ancestors_within(module_dir, repo_root) {
            let pom = dir.join("pom.xml");
            if pom.is_file() {
                return Some(pom);
            }
        }
        None
    }

    /// The Gradle invocation root: an ancestor settings descriptor anchors the
    /// multi-project build; a bare build descriptor is only a fallback.
    pub fn pick_gradle_root(&self, repo_root: &Path, scope_dir: Option<&Path>) -> Option<PathBuf> {
        if let Some(scope) = scope_dir {
            for dir in ancestors_within(scope, repo_root) {
                if contains_any(&dir, GRADLE_SETTINGS_FILES) {
                    return Some(dir);
                }
            }
        }

        let settings = self.scanner.find_all(repo_root, GRADLE_SETTINGS_FILES);
        if let Some(dir) = shallowest_parent(settings, repo_root) {
            return Some(dir);
        }

        if let Some(scope) = scope_dir {
            for dir in ancestors_within(scope, repo_root) {
                if contains_any(&dir, GRADLE_BUILD_FILES) {
                    return Some(dir);
                }
            }
        }

        let builds = self.scanner.find_all(repo_root, GRADLE_BUILD_FILES);
        shallowest_parent(builds, repo_root)
    }

    /// Walks upward from `start_dir` toward the repository root looking for a
    /// Maven or Gradle descriptor, then falls back to a repo-wide scan.
    pub fn find_build_root(
        &self,
        start_dir: &Path,
        repo_root: &Path,
    ) -> Result<(BuildTool, PathBuf), BuildError> {
        for dir in ancestors_within(start_dir, repo_root) {
            if dir.join("pom.xml").is_file() {
                return Ok((BuildTool::Maven, dir));
            }
            if contains_any(&dir, GRADLE_BUILD_FILES) {
                return Ok((BuildTool::Gradle, dir));
            }
        }

        if let Some(pom) = self.pick_best_pom(repo_root, None) {
            let dir = pom.parent().unwrap_or(repo_root).to_path_buf();
            return Ok((BuildTool::Maven, dir));
        }
        if let Some(dir) = self.pick_gradle_root(repo_root, None) {
            return Ok((BuildTool::Gradle, dir));
        }

        Err(BuildError::NoBuildRoot(repo_root.to_path_buf()))
    }

    /// Forward-slash relative path of `child` under `parent`; `.` when equal.
    pub fn relpath(child: &Path, parent: &Path) -> String {
        match child.strip_prefix(parent) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => child.to_string_lossy().replace('\\', "/"),
        }
    }
}

/// `start` and each of its ancestors, stopping at `repo_root` (inclusive).
fn ancestors_within(start: &Path, repo_root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut cur = start.to_path_buf();
    loop {
        out.push(cur.clone());
        if cur == repo_root {
            break;
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => break,
        }
    }
    out
}

fn contains_any(dir: &Path, names: &[&str]) -> bool {
    names.iter().any(|n| dir.join(n).is_file())
}

fn shallowest_parent(files: Vec<PathBuf>, repo_root: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = files
        .into_iter()
        .filter_map(|f| f.parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs.sort_by_key(|d| {
        d.strip_prefix(repo_root)
            .map(|rel| rel.components().count())
            .unwrap_or(usize::MAX)
    });
    dirs.into_iter().next()
}

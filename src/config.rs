//! Build-run configuration
//!
//! Immutable for the lifetime of a run. All output locations are derived from
//! a single base directory so local and containerized runs share one layout:
//! cloned repositories under `repos/`, produced artifacts and datasets under
//! `out/`, build-tool caches under `.cache/`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Repositories that are known to be unbuildable with this engine (exotic or
/// self-hosting build setups). Requests against them resolve to `SKIP-REPO`
/// without any build attempt.
pub const DEFAULT_SKIP_REPOS: &[&str] = &[
    "openjdk/jdk",
    "bazelbuild/bazel",
    "seleniumhq/selenium",
    "hibernate/hibernate-orm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Docker,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Input dataset: one row per target class.
    pub requests_csv: PathBuf,
    pub mode: RunMode,
    /// Base directory for local runs; docker runs always use `/work`.
    pub base_dir: PathBuf,
    /// Default JDK home, exported to every build-tool invocation when set.
    pub jdk_home: Option<PathBuf>,
    /// Alternate JDK home, used only for version-mismatch retries.
    pub alt_jdk_home: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub repos_csv: Option<PathBuf>,
    pub out_map_csv: Option<PathBuf>,
    pub skip_repos: BTreeSet<String>,
}

impl BuildConfig {
    pub fn new(requests_csv: PathBuf) -> Self {
        Self {
            requests_csv,
            mode: RunMode::Local,
            base_dir: PathBuf::from("."),
            jdk_home: None,
            alt_jdk_home: None,
            log_dir: None,
            repos_csv: None,
            out_map_csv: None,
            skip_repos: DEFAULT_SKIP_REPOS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn base(&self) -> PathBuf {
        match self.mode {
            RunMode::Docker => PathBuf::from("/work"),
            RunMode::Local => self.base_dir.clone(),
        }
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.base().join("repos")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.base().join("out")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base().join(".cache")
    }

    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.out_dir().join("logs-build"))
    }

    pub fn resolved_repos_csv(&self) -> PathBuf {
        self.repos_csv
            .clone()
            .unwrap_or_else(|| self.out_dir().join("repo_roots.csv"))
    }

    pub fn resolved_out_map_csv(&self) -> PathBuf {
        self.out_map_csv
            .clone()
            .unwrap_or_else(|| self.out_dir().join("class_to_fatjar_map.csv"))
    }

    pub fn is_skipped_repo(&self, repo: &str) -> bool {
        self.skip_repos.contains(repo)
    }

    /// Default location of a repository clone when the repo-roots dataset has
    /// no entry for it.
    pub fn default_repo_root(&self, repo: &str) -> PathBuf {
        self.repos_dir().join(crate::model::safe_name(repo))
    }

    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }
}

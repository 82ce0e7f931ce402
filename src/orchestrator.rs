//! Top-level build orchestration
//!
//! Maps many (repository, class-path) requests onto per-module build
//! attempts: every request is resolved to a module key, requests landing on
//! the same key share exactly one strategy-cascade run, and the single
//! outcome is fanned back out to every record when the mapping dataset is
//! written. Module failures are data, not process failures: the run
//! completes regardless of how many modules fail.

use crate::build_root::BuildRootDetector;
use crate::command::CommandRunner;
use crate::config::{BuildConfig, RunMode};
use crate::dataset::DatasetIo;
use crate::error::BuildError;
use crate::gradle::GradleFatJarBuilder;
use crate::maven::MavenFatJarBuilder;
use crate::model::{
    infer_fqcn_from_path, safe_name, BuildOutcome, BuildRecord, BuildRequest, BuildTool,
    ModuleKey, RepoRoot, Resolution,
};
use crate::wrapper::which;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One build-tool family's strategy cascade. Object-safe so the orchestrator
/// can be exercised with fakes.
pub trait ModuleBuilder {
    fn build(&self, repo: &str, repo_root: &Path, module_dir: &Path)
        -> Result<PathBuf, BuildError>;
}

impl ModuleBuilder for MavenFatJarBuilder {
    fn build(
        &self,
        repo: &str,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<PathBuf, BuildError> {
        MavenFatJarBuilder::build(self, repo, repo_root, module_dir)
    }
}

impl ModuleBuilder for GradleFatJarBuilder {
    fn build(
        &self,
        repo: &str,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<PathBuf, BuildError> {
        GradleFatJarBuilder::build(self, repo, repo_root, module_dir)
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: usize,
    pub modules: usize,
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct BuildOrchestrator {
    cfg: BuildConfig,
    io: DatasetIo,
    detector: BuildRootDetector,
    maven: Box<dyn ModuleBuilder>,
    gradle: Box<dyn ModuleBuilder>,
    runner: Arc<CommandRunner>,
}

impl BuildOrchestrator {
    pub fn new(
        cfg: BuildConfig,
        io: DatasetIo,
        detector: BuildRootDetector,
        maven: Box<dyn ModuleBuilder>,
        gradle: Box<dyn ModuleBuilder>,
        runner: Arc<CommandRunner>,
    ) -> Self {
        Self {
            cfg,
            io,
            detector,
            maven,
            gradle,
            runner,
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        for dir in [
            self.cfg.repos_dir(),
            self.cfg.out_dir(),
            self.cfg.cache_dir(),
        ] {
            fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }

        if self.cfg.mode == RunMode::Local {
            which("java").context("a JDK is required on PATH for local runs")?;
        }

        let requests = self.io.read_requests(&self.cfg.requests_csv)?;
        if requests.is_empty() {
            bail!(
                "no usable rows in {}",
                self.cfg.requests_csv.display()
            );
        }

        let repos_csv = self.cfg.resolved_repos_csv();
        let repo_roots = if repos_csv.is_file() {
            self.io.read_repo_roots(&repos_csv)?
        } else {
            warn!(path = %repos_csv.display(), "repo roots dataset missing, using default clone locations");
            BTreeMap::new()
        };

        let mut records = Vec::with_capacity(requests.len());
        let mut module_dirs: BTreeMap<ModuleKey, PathBuf> = BTreeMap::new();
        for request in &requests {
            let (record, module) = self.resolve_request(request, &repo_roots);
            records.push(record);
            if let Some((key, dir)) = module {
                module_dirs.entry(key).or_insert(dir);
            }
        }

        let mut summary = RunSummary {
            records: records.len(),
            modules: module_dirs.len(),
            ..RunSummary::default()
        };

        let mut outcomes: BTreeMap<ModuleKey, BuildOutcome> = BTreeMap::new();
        for (key, module_dir) in &module_dirs {
            let outcome = self.build_module(key, module_dir, &repo_roots);
            match &outcome {
                BuildOutcome::Artifact(_) => summary.built += 1,
                BuildOutcome::Skip(_) => summary.skipped += 1,
                BuildOutcome::Fail => summary.failed += 1,
            }
            outcomes.insert(key.clone(), outcome);
        }

        let out_map = self.cfg.resolved_out_map_csv();
        self.io.write_map(&out_map, &records, &outcomes)?;

        info!(
            records = summary.records,
            modules = summary.modules,
            built = summary.built,
            skipped = summary.skipped,
            failed = summary.failed,
            "build run complete"
        );
        info!("fat jars in: {}", self.cfg.out_dir().display());
        info!("mapping dataset: {}", out_map.display());
        Ok(summary)
    }

    fn repo_root_for(&self, repo: &str, roots: &BTreeMap<String, RepoRoot>) -> PathBuf {
        roots
            .get(repo)
            .map(|r| r.repo_root.clone())
            .unwrap_or_else(|| self.cfg.default_repo_root(repo))
    }

    /// Resolves one request to a record (always) and a buildable module key
    /// (when the repository is present and a build root exists).
    fn resolve_request(
        &self,
        request: &BuildRequest,
        roots: &BTreeMap<String, RepoRoot>,
    ) -> (BuildRecord, Option<(ModuleKey, PathBuf)>) {
        let fqcn = infer_fqcn_from_path(&request.class_path).unwrap_or_default();
        let unresolved = |resolution: Resolution| BuildRecord {
            repo: request.repo.clone(),
            class_path: request.class_path.clone(),
            test_paths: request.test_paths.clone(),
            resolution,
            module_rel: String::new(),
            fqcn: fqcn.clone(),
        };

        if self.cfg.is_skipped_repo(&request.repo) {
            return (unresolved(Resolution::SkipRepo), None);
        }

        let root = self.repo_root_for(&request.repo, roots);
        if !root.is_dir() {
            warn!(repo = %request.repo, root = %root.display(), "clone missing, skipping");
            return (unresolved(Resolution::Skip), None);
        }

        let class_abs = root.join(&request.class_path);
        let start_dir = if class_abs.is_file() {
            class_abs.parent().unwrap_or(&root).to_path_buf()
        } else {
            root.clone()
        };

        let (tool, module_dir) = match self.detector.find_build_root(&start_dir, &root) {
            Ok(found) => found,
            Err(e) => {
                warn!(repo = %request.repo, error = %e, "no build root, skipping");
                return (unresolved(Resolution::Skip), None);
            }
        };

        let module_rel = BuildRootDetector::relpath(&module_dir, &root);
        let key = ModuleKey {
            repo: request.repo.clone(),
            tool,
            module_rel: module_rel.clone(),
        };
        let record = BuildRecord {
            repo: request.repo.clone(),
            class_path: request.class_path.clone(),
            test_paths: request.test_paths.clone(),
            resolution: Resolution::Tool(tool),
            module_rel,
            fqcn,
        };
        (record, Some((key, module_dir)))
    }

    /// Runs the matching cascade exactly once and records the terminal
    /// outcome; a winning jar is copied into the per-module output directory.
    fn build_module(
        &self,
        key: &ModuleKey,
        module_dir: &Path,
        roots: &BTreeMap<String, RepoRoot>,
    ) -> BuildOutcome {
        let root = self.repo_root_for(&key.repo, roots);
        self.runner.set_context(&key.repo, &key.module_rel);
        info!(repo = %key.repo, tool = %key.tool, module = %key.module_rel, "==== BUILD ====");

        let builder: &dyn ModuleBuilder = match key.tool {
            BuildTool::Maven => self.maven.as_ref(),
            BuildTool::Gradle => self.gradle.as_ref(),
        };

        match builder.build(&key.repo, &root, module_dir) {
            Ok(jar) => match self.store_artifact(key, &jar) {
                Ok(out_path) => {
                    info!(repo = %key.repo, module = %key.module_rel, "[OK] {}", out_path.display());
                    BuildOutcome::Artifact(out_path)
                }
                Err(e) => {
                    error!(repo = %key.repo, module = %key.module_rel, error = %e, "[FAIL] cannot store artifact");
                    BuildOutcome::Fail
                }
            },
            Err(BuildError::Skip(reason)) => {
                info!(repo = %key.repo, module = %key.module_rel, "[SKIP] {}", reason);
                BuildOutcome::Skip(reason)
            }
            Err(e) => {
                error!(repo = %key.repo, module = %key.module_rel, error = %e, "[FAIL]");
                BuildOutcome::Fail
            }
        }
    }

    fn store_artifact(&self, key: &ModuleKey, jar: &Path) -> Result<PathBuf, BuildError> {
        let module_part = match key.module_rel.as_str() {
            "" | "." => "root".to_string(),
            rel => safe_name(rel),
        };
        let out_sub = self
            .cfg
            .out_dir()
            .join(safe_name(&key.repo))
            .join(module_part);
        fs::create_dir_all(&out_sub)?;

        let name = jar
            .file_name()
            .ok_or_else(|| BuildError::NoArtifact(jar.to_path_buf()))?;
        let out_path = out_sub.join(name);
        fs::copy(jar, &out_path)?;
        Ok(out_path)
    }
}

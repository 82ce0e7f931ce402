//! Row-oriented dataset I/O
//!
//! Thin wrappers around the engine: the input requests dataset, the
//! externally-produced repository-roots mapping, and the output mapping that
//! mirrors the input extended with resolution and artifact columns. Rows the
//! engine cannot use (blank repo/class, failed clones) are dropped on read;
//! the output always carries one row per input record.

use crate::model::{BuildOutcome, BuildRecord, BuildRequest, ModuleKey, RepoRoot};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    repo: String,
    #[serde(default)]
    class_path: String,
    #[serde(default)]
    test_paths: String,
}

#[derive(Debug, Deserialize)]
struct RawRepoRoot {
    #[serde(default)]
    repo: String,
    #[serde(default)]
    repo_root: String,
}

/// One output row: the input record plus resolution and artifact columns.
#[derive(Debug, Serialize)]
struct MapRow<'a> {
    repo: &'a str,
    build_tool: String,
    module_rel: &'a str,
    class_path: &'a str,
    fqcn: &'a str,
    test_paths: &'a str,
    fatjar_path: String,
}

#[derive(Debug, Default, Clone)]
pub struct DatasetIo;

impl DatasetIo {
    pub fn new() -> Self {
        Self
    }

    /// Reads build requests, dropping rows without a repo or class path.
    /// Ragged rows deserialize with empty fields and fall to the same filter.
    pub fn read_requests(&self, path: &Path) -> Result<Vec<BuildRequest>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("cannot open requests dataset {}", path.display()))?;
        let mut out = Vec::new();
        for row in reader.deserialize::<RawRequest>() {
            let row = row.context("malformed request row")?;
            let repo = row.repo.trim().to_string();
            let class_path = row.class_path.trim().to_string();
            if repo.is_empty() || class_path.is_empty() {
                continue;
            }
            out.push(BuildRequest {
                repo,
                class_path,
                test_paths: row.test_paths.trim().to_string(),
            });
        }
        Ok(out)
    }

    /// Reads the repo → clone-root mapping, dropping failed/skipped clones.
    pub fn read_repo_roots(&self, path: &Path) -> Result<BTreeMap<String, RepoRoot>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("cannot open repo roots dataset {}", path.display()))?;
        let mut out = BTreeMap::new();
        for row in reader.deserialize::<RawRepoRoot>() {
            let row = row.context("malformed repo root row")?;
            let repo = row.repo.trim().to_string();
            let root = row.repo_root.trim().to_string();
            if repo.is_empty() || root.is_empty() || root == "FAIL" || root == "SKIP-REPO" {
                continue;
            }
            out.insert(
                repo.clone(),
                RepoRoot {
                    repo,
                    repo_root: root.into(),
                },
            );
        }
        Ok(out)
    }

    /// Writes the output mapping: every record sharing a module key gets that
    /// key's single outcome; unresolved records echo their skip marker.
    pub fn write_map(
        &self,
        path: &Path,
        records: &[BuildRecord],
        outcomes: &BTreeMap<ModuleKey, BuildOutcome>,
    ) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("cannot write mapping dataset {}", path.display()))?;

        for record in records {
            let fatjar_path = match record.module_key() {
                None => record.resolution.to_string(),
                Some(key) => outcomes
                    .get(&key)
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| BuildOutcome::Fail.to_string()),
            };
            writer.serialize(MapRow {
                repo: &record.repo,
                build_tool: record.resolution.to_string(),
                module_rel: &record.module_rel,
                class_path: &record.class_path,
                fqcn: &record.fqcn,
                test_paths: &record.test_paths,
                fatjar_path,
            })?;
        }
        writer.flush().context("cannot flush mapping dataset")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildTool, Resolution};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_read_requests_drops_incomplete_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("requests.csv");
        fs::write(
            &path,
            "repo,class_path,test_paths\n\
             acme/widget,core/src/main/java/A.java,tests/ATest.java\n\
             ,core/src/main/java/B.java,\n\
             acme/gadget,,\n",
        )
        .unwrap();

        let rows = DatasetIo::new().read_requests(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].repo, "acme/widget");
        assert_eq!(rows[0].test_paths, "tests/ATest.java");
    }

    #[test]
    fn test_read_requests_tolerates_ragged_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("requests.csv");
        // a repo-only row and a row missing only test_paths
        fs::write(
            &path,
            "repo,class_path,test_paths\n\
             acme/solo\n\
             acme/widget,core/src/main/java/A.java\n",
        )
        .unwrap();

        let rows = DatasetIo::new().read_requests(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].repo, "acme/widget");
        assert_eq!(rows[0].test_paths, "");
    }

    #[test]
    fn test_read_repo_roots_tolerates_ragged_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo_roots.csv");
        fs::write(
            &path,
            "repo,repo_root\n\
             acme/ragged\n\
             acme/widget,/work/repos/acme_widget\n",
        )
        .unwrap();

        let roots = DatasetIo::new().read_repo_roots(&path).unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots.contains_key("acme/widget"));
    }

    #[test]
    fn test_read_repo_roots_drops_markers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo_roots.csv");
        fs::write(
            &path,
            "repo,repo_root\n\
             acme/widget,/work/repos/acme_widget\n\
             acme/gone,FAIL\n\
             acme/banned,SKIP-REPO\n\
             acme/empty,\n",
        )
        .unwrap();

        let roots = DatasetIo::new().read_repo_roots(&path).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(
            roots["acme/widget"].repo_root,
            PathBuf::from("/work/repos/acme_widget")
        );
    }

    #[test]
    fn test_write_map_fans_outcome_to_all_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("map.csv");

        let key = ModuleKey {
            repo: "acme/widget".to_string(),
            tool: BuildTool::Maven,
            module_rel: "core".to_string(),
        };
        let record = |class_path: &str| BuildRecord {
            repo: "acme/widget".to_string(),
            class_path: class_path.to_string(),
            test_paths: String::new(),
            resolution: Resolution::Tool(BuildTool::Maven),
            module_rel: "core".to_string(),
            fqcn: String::new(),
        };
        let records = vec![record("core/src/main/java/A.java"), record("core/src/main/java/B.java")];
        let mut outcomes = BTreeMap::new();
        outcomes.insert(key, BuildOutcome::Artifact(PathBuf::from("/out/app-all.jar")));

        DatasetIo::new().write_map(&path, &records, &outcomes).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("/out/app-all.jar").count(), 2);
    }

    #[test]
    fn test_write_map_echoes_skip_markers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("map.csv");
        let records = vec![
            BuildRecord {
                repo: "openjdk/jdk".to_string(),
                class_path: "x/A.java".to_string(),
                test_paths: String::new(),
                resolution: Resolution::SkipRepo,
                module_rel: String::new(),
                fqcn: String::new(),
            },
            BuildRecord {
                repo: "acme/empty".to_string(),
                class_path: "x/B.java".to_string(),
                test_paths: String::new(),
                resolution: Resolution::Skip,
                module_rel: String::new(),
                fqcn: String::new(),
            },
        ];

        DatasetIo::new().write_map(&path, &records, &BTreeMap::new()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("SKIP-REPO"));
        assert!(text.lines().any(|l| l.contains("acme/empty") && l.ends_with("SKIP")));
    }

    #[test]
    fn test_write_map_unbuilt_module_is_fail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("map.csv");
        let records = vec![BuildRecord {
            repo: "acme/widget".to_string(),
            class_path: "core/src/main/java/A.java".to_string(),
            test_paths: String::new(),
            resolution: Resolution::Tool(BuildTool::Gradle),
            module_rel: "app".to_string(),
            fqcn: String::new(),
        }];

        DatasetIo::new().write_map(&path, &records, &BTreeMap::new()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().any(|l| l.ends_with("FAIL")));
    }
}

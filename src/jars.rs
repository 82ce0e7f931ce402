//! Produced-archive selection heuristics
//!
//! Build output directories accumulate sources jars, javadoc jars, test jars
//! and the pre-shading `original-` artifact alongside the one jar worth
//! keeping. The picker filters those out and prefers names that look like fat
//! archives. It is a heuristic: callers re-check `is_fat` before trusting a
//! result as final.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name fragments that mark a jar as a bundled-dependencies artifact.
const FAT_HINTS: &[&str] = &[
    "jar-with-dependencies",
    "all",
    "uber",
    "with-dependencies",
    "shadow",
    "shaded",
];

/// Name fragments of jars that are never deployable runtime artifacts.
const BAD_TOKENS: &[&str] = &[
    "-sources",
    "-javadoc",
    "original-",
    "-tests",
    "-test",
    "-it",
    "-integration-test",
    "-client",
];

#[derive(Debug, Default, Clone)]
pub struct JarPicker;

impl JarPicker {
    pub fn new() -> Self {
        Self
    }

    pub fn is_fat(&self, jar: &Path) -> bool {
        let name = file_name_lower(jar);
        FAT_HINTS.iter().any(|h| name.contains(h))
    }

    fn is_bad_classifier(name: &str) -> bool {
        let n = name.to_lowercase();
        BAD_TOKENS.iter().any(|t| n.contains(t))
    }

    /// Jars in `dir`, newest first by modification time.
    pub fn jars_by_mtime(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut jars: Vec<(SystemTime, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_str()?;
                if !name.ends_with(".jar") || !path.is_file() {
                    return None;
                }
                let mtime = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((mtime, path))
            })
            .collect();
        jars.sort_by(|a, b| b.0.cmp(&a.0));
        jars.into_iter().map(|(_, p)| p).collect()
    }

    /// Best runtime jar in `dir`: most recent fat-named jar, else the most
    /// recent jar at all; never a sources/javadoc/test/`original-` jar.
    pub fn pick_best(&self, dir: &Path) -> Option<PathBuf> {
        let jars: Vec<PathBuf> = self
            .jars_by_mtime(dir)
            .into_iter()
            .filter(|j| !Self::is_bad_classifier(&file_name_lower(j)))
            .collect();

        jars.iter().find(|j| self.is_fat(j)).cloned().or_else(|| jars.first().cloned())
    }
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    fn jar(dir: &Path, name: &str, mtime_secs: i64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "PK").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
        path
    }

    #[test]
    fn test_prefers_fat_named_jar() {
        let tmp = TempDir::new().unwrap();
        jar(tmp.path(), "foo.jar", 3_000);
        let all = jar(tmp.path(), "foo-all.jar", 2_000);
        jar(tmp.path(), "foo-sources.jar", 4_000);

        assert_eq!(JarPicker::new().pick_best(tmp.path()), Some(all));
    }

    #[test]
    fn test_newest_fat_jar_wins() {
        let tmp = TempDir::new().unwrap();
        jar(tmp.path(), "foo.jar", 1_000);
        let newest = jar(tmp.path(), "foo-all.jar", 3_000);
        jar(tmp.path(), "foo-sources.jar", 2_000);

        assert_eq!(JarPicker::new().pick_best(tmp.path()), Some(newest));
    }

    #[test]
    fn test_never_returns_non_runtime_jars() {
        let tmp = TempDir::new().unwrap();
        jar(tmp.path(), "foo-sources.jar", 3_000);
        jar(tmp.path(), "foo-javadoc.jar", 2_000);
        jar(tmp.path(), "original-foo.jar", 1_000);
        jar(tmp.path(), "foo-tests.jar", 500);

        assert_eq!(JarPicker::new().pick_best(tmp.path()), None);
    }

    #[test]
    fn test_falls_back_to_newest_thin_jar() {
        let tmp = TempDir::new().unwrap();
        jar(tmp.path(), "foo-1.0.jar", 1_000);
        let newest = jar(tmp.path(), "foo-1.1.jar", 2_000);

        assert_eq!(JarPicker::new().pick_best(tmp.path()), Some(newest));
    }

    #[test]
    fn test_missing_or_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let picker = JarPicker::new();
        assert_eq!(picker.pick_best(&tmp.path().join("no-such-dir")), None);
        assert_eq!(picker.pick_best(tmp.path()), None);
    }

    #[test]
    fn test_is_fat_hints() {
        let picker = JarPicker::new();
        assert!(picker.is_fat(Path::new("app-jar-with-dependencies.jar")));
        assert!(picker.is_fat(Path::new("app-shaded.jar")));
        assert!(picker.is_fat(Path::new("app-ALL.jar")));
        assert!(!picker.is_fat(Path::new("app-1.0.jar")));
    }
}

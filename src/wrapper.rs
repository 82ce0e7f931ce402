//! Wrapper-vs-system build tool selection
//!
//! A bundled wrapper is only usable when both the launcher script and its
//! companion support jar are present; half-committed wrappers (launcher
//! without jar) are common and would fail at startup. The repository root is
//! checked before the module directory: monorepos usually carry one wrapper
//! at the root, but a deep module occasionally ships its own.

use crate::error::BuildError;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone)]
pub struct WrapperSelector;

impl WrapperSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn mvnw_is_usable(root: &Path) -> bool {
        root.join("mvnw").is_file() && root.join(".mvn/wrapper/maven-wrapper.jar").is_file()
    }

    pub fn gradlew_is_usable(root: &Path) -> bool {
        root.join("gradlew").is_file() && root.join("gradle/wrapper/gradle-wrapper.jar").is_file()
    }

    /// Argv head for Maven: repository wrapper, module wrapper, or system
    /// `mvn`, in that order.
    pub fn pick_maven(
        &self,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<Vec<String>, BuildError> {
        for root in [repo_root, module_dir] {
            if Self::mvnw_is_usable(root) {
                let mvnw = root.join("mvnw");
                ensure_executable(&mvnw);
                return Ok(vec![mvnw.to_string_lossy().into_owned()]);
            }
        }
        which("mvn")?;
        Ok(vec!["mvn".to_string()])
    }

    /// Argv head for Gradle, same ordering as [`Self::pick_maven`].
    pub fn pick_gradle(
        &self,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<Vec<String>, BuildError> {
        for root in [repo_root, module_dir] {
            if Self::gradlew_is_usable(root) {
                let gradlew = root.join("gradlew");
                ensure_executable(&gradlew);
                return Ok(vec![gradlew.to_string_lossy().into_owned()]);
            }
        }
        which("gradle")?;
        Ok(vec!["gradle".to_string()])
    }
}

/// Locates `name` on PATH. Git clones and tarball extractions routinely drop
/// the execute bit, so the existence check is enough here; the bit is fixed
/// separately by [`ensure_executable`].
pub fn which(name: &str) -> Result<PathBuf, BuildError> {
    let path = env::var_os("PATH").unwrap_or_default();
    for dir in env::split_paths(&path) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(BuildError::ToolNotFound(name.to_string()))
}

#[cfg(unix)]
fn ensure_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = path.metadata() {
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o111);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn install_mvnw(root: &Path, with_jar: bool) {
        fs::write(root.join("mvnw"), "#!/bin/sh\n").unwrap();
        if with_jar {
            fs::create_dir_all(root.join(".mvn/wrapper")).unwrap();
            fs::write(root.join(".mvn/wrapper/maven-wrapper.jar"), "jar").unwrap();
        }
    }

    #[test]
    fn test_wrapper_requires_support_jar() {
        let tmp = TempDir::new().unwrap();
        install_mvnw(tmp.path(), false);
        assert!(!WrapperSelector::mvnw_is_usable(tmp.path()));

        let tmp2 = TempDir::new().unwrap();
        install_mvnw(tmp2.path(), true);
        assert!(WrapperSelector::mvnw_is_usable(tmp2.path()));
    }

    #[test]
    fn test_repo_root_wrapper_wins() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("deep/module");
        fs::create_dir_all(&module).unwrap();
        install_mvnw(tmp.path(), true);

        let argv = WrapperSelector::new().pick_maven(tmp.path(), &module).unwrap();
        assert_eq!(argv, vec![tmp.path().join("mvnw").to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_module_local_wrapper_second_chance() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("deep/module");
        fs::create_dir_all(&module).unwrap();
        install_mvnw(&module, true);

        let argv = WrapperSelector::new().pick_maven(tmp.path(), &module).unwrap();
        assert_eq!(argv, vec![module.join("mvnw").to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_which_missing_tool() {
        assert!(matches!(
            which("definitely-not-a-real-build-tool-9f2c"),
            Err(BuildError::ToolNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_wrapper_becomes_executable() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        install_mvnw(tmp.path(), true);
        let mvnw = tmp.path().join("mvnw");
        fs::set_permissions(&mvnw, fs::Permissions::from_mode(0o644)).unwrap();

        WrapperSelector::new().pick_maven(tmp.path(), tmp.path()).unwrap();
        assert_ne!(mvnw.metadata().unwrap().permissions().mode() & 0o111, 0);
    }
}

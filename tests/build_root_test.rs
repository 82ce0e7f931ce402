//! Build-root discovery integration tests
//!
//! Covers the fallback paths that only show up on realistic repository
//! shapes: missing class files, vendored copies, aggregator ranking across a
//! monorepo, and Gradle settings anchoring.

use jarsmith::model::BuildTool;
use jarsmith::{BuildRootDetector, RepoScanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn detector() -> BuildRootDetector {
    BuildRootDetector::new(RepoScanner::new())
}

#[test]
fn test_start_path_outside_any_module_falls_back_to_aggregator() {
    let tmp = TempDir::new().unwrap();
    // the recorded class path no longer exists; detection starts at the root
    write(
        &tmp.path().join("backend/pom.xml"),
        "<project><modules><module>api</module><module>impl</module></modules></project>",
    );
    write(&tmp.path().join("backend/api/pom.xml"), "<project/>");
    write(&tmp.path().join("backend/impl/pom.xml"), "<project/>");

    let (tool, dir) = detector().find_build_root(tmp.path(), tmp.path()).unwrap();
    assert_eq!(tool, BuildTool::Maven);
    assert_eq!(dir, tmp.path().join("backend"));
}

#[test]
fn test_vendored_copy_inside_build_output_is_ignored() {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("target/vendored/pom.xml"),
        "<project><modules><module>x</module></modules></project>",
    );
    write(&tmp.path().join("service/pom.xml"), "<project/>");

    let (_, dir) = detector().find_build_root(tmp.path(), tmp.path()).unwrap();
    assert_eq!(dir, tmp.path().join("service"));
}

#[test]
fn test_gradle_settings_anchors_deep_module() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("settings.gradle.kts"), "include(\":services:billing\")");
    write(&tmp.path().join("services/billing/build.gradle.kts"), "plugins {}");
    let class_dir = tmp.path().join("services/billing/src/main/java/com/acme");
    fs::create_dir_all(&class_dir).unwrap();

    // the module itself is found by the ancestor walk...
    let (tool, dir) = detector().find_build_root(&class_dir, tmp.path()).unwrap();
    assert_eq!(tool, BuildTool::Gradle);
    assert_eq!(dir, tmp.path().join("services/billing"));

    // ...but the invocation root is the settings directory
    let root = detector().pick_gradle_root(tmp.path(), Some(&dir)).unwrap();
    assert_eq!(root, tmp.path().to_path_buf());
}

#[test]
fn test_gradle_shallowest_settings_wins_without_scope() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("deep/nested/settings.gradle"), "");
    write(&tmp.path().join("sub/settings.gradle"), "");

    let root = detector().pick_gradle_root(tmp.path(), None).unwrap();
    assert_eq!(root, tmp.path().join("sub"));
}

#[test]
fn test_reactor_root_for_module_walks_ancestors_first() {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("pom.xml"),
        "<project><modules><module>a</module></modules></project>",
    );
    write(&tmp.path().join("a/pom.xml"), "<project/>");
    // a deeper aggregator elsewhere must not shadow the ancestor chain
    write(
        &tmp.path().join("other/tree/pom.xml"),
        "<project><modules><module>b</module></modules></project>",
    );

    let pom = detector()
        .pick_best_pom(tmp.path(), Some(&tmp.path().join("a")))
        .unwrap();
    assert_eq!(pom, tmp.path().join("pom.xml"));
}

#[test]
fn test_module_rel_is_dot_for_repo_root_module() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("pom.xml"), "<project/>");

    let (_, dir) = detector().find_build_root(tmp.path(), tmp.path()).unwrap();
    assert_eq!(BuildRootDetector::relpath(&dir, tmp.path()), ".");
}

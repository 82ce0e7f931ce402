//! Gradle fat-jar strategy cascade
//!
//! Plain `jar` first, then `shadowJar`; most modern Gradle repositories ship
//! a shadow configuration of their own, which is why there is no Gradle
//! equivalent of the pom patcher. Classification matters more than ordering
//! here: a JDK-version requirement is a hard environment incompatibility and
//! must surface as a skip, not a generic failure.

use crate::build_root::BuildRootDetector;
use crate::command::{env_snapshot, with_java_home, CommandRunner};
use crate::error::BuildError;
use crate::jars::JarPicker;
use crate::wrapper::WrapperSelector;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a failed Gradle invocation's output tells us to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradleFailure {
    /// Build requires a newer JDK than any the environment offers.
    /// Non-retryable; raises a skip regardless of the alternate JDK.
    JdkRequirement,
    /// `verification-metadata.xml` rejected an artifact; retry once with
    /// verification off.
    DependencyVerification,
    /// A dependency artifact is gone from every repository; retry once with a
    /// forced refresh, then skip.
    MissingArtifact,
    /// The shadow plugin is present but misconfigured; fall back to `jar`.
    ShadowMisconfigured,
    Other,
}

pub fn classify_gradle_failure(out: &str) -> GradleFailure {
    if out.contains("requires at least JDK") || out.contains("at least JDK") {
        return GradleFailure::JdkRequirement;
    }
    if out.contains("Dependency verification failed") || out.contains("verification-metadata.xml") {
        return GradleFailure::DependencyVerification;
    }
    if out.contains("Could not find ") && out.contains("Searched in the following locations") {
        return GradleFailure::MissingArtifact;
    }
    if out.contains("Could not get unknown property") || out.contains("Cannot get property") {
        return GradleFailure::ShadowMisconfigured;
    }
    GradleFailure::Other
}

pub struct GradleFatJarBuilder {
    runner: Arc<CommandRunner>,
    wrappers: WrapperSelector,
    detector: BuildRootDetector,
    jar_picker: JarPicker,
    jdk_home: Option<PathBuf>,
    cache_dir: PathBuf,
}

impl GradleFatJarBuilder {
    pub fn new(
        runner: Arc<CommandRunner>,
        wrappers: WrapperSelector,
        detector: BuildRootDetector,
        jar_picker: JarPicker,
        jdk_home: Option<PathBuf>,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            wrappers,
            detector,
            jar_picker,
            jdk_home,
            cache_dir,
        }
    }

    pub fn build(
        &self,
        _repo: &str,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<PathBuf, BuildError> {
        // Per-invocation cache home: concurrent workers must not contend on
        // the system-wide ~/.gradle.
        let mut env = match &self.jdk_home {
            Some(home) => with_java_home(&env_snapshot(), home),
            None => env_snapshot(),
        };
        env.insert(
            "GRADLE_USER_HOME".to_string(),
            self.cache_dir.join("gradle-home").to_string_lossy().into_owned(),
        );

        let gradle_root = self
            .detector
            .pick_gradle_root(repo_root, Some(module_dir))
            .unwrap_or_else(|| module_dir.to_path_buf());
        let gradle = self.wrappers.pick_gradle(repo_root, &gradle_root)?;

        let libs_candidates = [
            module_dir.join("build").join("libs"),
            gradle_root.join("build").join("libs"),
        ];
        let pick_any = |picker: &JarPicker| -> Option<PathBuf> {
            libs_candidates.iter().find_map(|d| picker.pick_best(d))
        };

        let run = |args: &[&str]| -> Result<String, BuildError> {
            let mut argv = gradle.clone();
            argv.push("--no-daemon".to_string());
            argv.extend(args.iter().map(|s| s.to_string()));
            self.runner.run(&argv, &gradle_root, &env)
        };

        // plain archive task
        if let Err(err) = run(&["jar", "-x", "test"]) {
            match classify_gradle_failure(err.output()) {
                GradleFailure::JdkRequirement => {
                    return Err(BuildError::Skip(
                        "requires a newer JDK than available".to_string(),
                    ));
                }
                GradleFailure::DependencyVerification => {
                    run(&["--dependency-verification=off", "jar", "-x", "test"])?;
                }
                GradleFailure::MissingArtifact => {
                    if run(&["--refresh-dependencies", "jar", "-x", "test"]).is_err() {
                        return Err(BuildError::Skip(
                            "missing dependency artifact (cannot resolve)".to_string(),
                        ));
                    }
                }
                // an earlier task may still have left a usable archive;
                // shadowJar gets its own attempt below either way
                _ => debug!("plain jar failed without a known signature"),
            }
        }

        if let Some(jar) = pick_any(&self.jar_picker) {
            return Ok(jar);
        }

        // shadow task
        if let Err(err) = run(&["shadowJar", "-x", "test"]) {
            match classify_gradle_failure(err.output()) {
                GradleFailure::JdkRequirement => {
                    return Err(BuildError::Skip(
                        "requires a newer JDK than available".to_string(),
                    ));
                }
                GradleFailure::DependencyVerification => {
                    run(&["--dependency-verification=off", "shadowJar", "-x", "test"])?;
                }
                GradleFailure::MissingArtifact => {
                    if run(&["--refresh-dependencies", "jar", "-x", "test"]).is_err() {
                        return Err(BuildError::Skip(
                            "missing dependency artifact (cannot resolve)".to_string(),
                        ));
                    }
                }
                GradleFailure::ShadowMisconfigured => {
                    debug!("shadow plugin misconfigured, falling back to plain jar");
                    run(&["jar", "-x", "test"])?;
                }
                GradleFailure::Other => {
                    warn!("shadowJar failed without a known signature, retrying plain jar");
                    run(&["jar", "-x", "test"])?;
                }
            }
        }

        pick_any(&self.jar_picker).ok_or_else(|| {
            BuildError::NoArtifact(libs_candidates[0].clone())
        })
    }
}

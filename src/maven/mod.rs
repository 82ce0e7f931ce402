//! Maven fat-jar strategy cascade
//!
//! Strictly ordered, bounded cascade:
//! 1. `package` via the reactor root (`-am -pl <module>`), falling back to a
//!    standalone `package` when the module is missing from the reactor, with
//!    one alternate-JDK retry on a version-mismatch classification
//! 2. stop early if the produced jar already looks fat
//! 3. direct assembly-plugin CLI invocation (`single`, jar-with-dependencies)
//! 4. scoped pom patch + re-package, descriptor restored on every exit path
//! 5. direct shade-plugin invocation
//! 6. final artifact selection, excluding test jars
//!
//! Steps 3-5 have high legitimate failure rates (aggregator modules reject
//! direct plugin goals); their failures are classified and logged but never
//! abort the cascade.

pub mod classify;
pub mod pom_patcher;

pub use classify::{classify_maven_failure, MavenFailure, MavenFailureCode};
pub use pom_patcher::{PatchState, PomPatchGuard, PomPatcher, ASSEMBLY_PLUGIN_XML};

use crate::build_root::BuildRootDetector;
use crate::command::{env_snapshot, with_java_home, CommandRunner, EnvMap};
use crate::error::BuildError;
use crate::jars::JarPicker;
use crate::wrapper::WrapperSelector;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const ASSEMBLY_GOAL: &str = "org.apache.maven.plugins:maven-assembly-plugin:3.6.0:single";
const SHADE_GOAL: &str = "org.apache.maven.plugins:maven-shade-plugin:3.5.0:shade";

/// Verification/formatting plugins are never worth running for a packaging
/// build and break constantly on uncontrolled repositories.
const SKIP_FLAGS: &[&str] = &[
    "-DskipTests",
    "-DskipITs",
    "-Dinvoker.skip=true",
    "-Denforcer.skip=true",
    "-Dformatter.skip=true",
    "-Dlicense.skip=true",
    "-Dspotless.apply.skip=true",
    "-Dspotless.check.skip=true",
];

pub struct MavenFatJarBuilder {
    runner: Arc<CommandRunner>,
    wrappers: WrapperSelector,
    detector: BuildRootDetector,
    jar_picker: JarPicker,
    jdk_home: Option<PathBuf>,
    alt_jdk_home: Option<PathBuf>,
}

/// Resolved invocation geometry for one module, computed once per build.
struct MavenPlan {
    common: Vec<String>,
    root_pom: PathBuf,
    module_pom: PathBuf,
    reactor_dir: PathBuf,
    module_dir: PathBuf,
    module_rel: String,
    use_reactor: bool,
    jar_dir: PathBuf,
}

impl MavenFatJarBuilder {
    pub fn new(
        runner: Arc<CommandRunner>,
        wrappers: WrapperSelector,
        detector: BuildRootDetector,
        jar_picker: JarPicker,
        jdk_home: Option<PathBuf>,
        alt_jdk_home: Option<PathBuf>,
    ) -> Self {
        Self {
            runner,
            wrappers,
            detector,
            jar_picker,
            jdk_home,
            alt_jdk_home,
        }
    }

    /// Quarkus modules fail extension verification under a plain `package`.
    fn repo_extras(repo: &str) -> Vec<String> {
        if repo == "quarkusio/quarkus" {
            vec!["-Dquarkus-extension-verify=false".to_string()]
        } else {
            Vec::new()
        }
    }

    fn plan(&self, repo: &str, repo_root: &Path, module_dir: &Path) -> Result<MavenPlan, BuildError> {
        let module_pom = self
            .detector
            .pick_module_pom(module_dir, repo_root)
            .ok_or_else(|| BuildError::NoBuildRoot(module_dir.to_path_buf()))?;
        let module_dir = module_pom
            .parent()
            .unwrap_or(repo_root)
            .to_path_buf();

        let root_pom = self
            .detector
            .pick_best_pom(repo_root, Some(&module_dir))
            .unwrap_or_else(|| module_pom.clone());
        let reactor_dir = root_pom.parent().unwrap_or(repo_root).to_path_buf();
        let module_rel = BuildRootDetector::relpath(&module_dir, &reactor_dir);
        let use_reactor = root_pom != module_pom;

        let mvn = self.wrappers.pick_maven(repo_root, &module_dir)?;
        let mut common = mvn;
        common.push("-q".to_string());
        common.extend(SKIP_FLAGS.iter().map(|s| s.to_string()));
        common.extend(Self::repo_extras(repo));

        Ok(MavenPlan {
            common,
            jar_dir: module_dir.join("target"),
            root_pom,
            module_pom,
            reactor_dir,
            module_dir,
            module_rel,
            use_reactor,
        })
    }

    fn base_env(&self) -> EnvMap {
        let env = env_snapshot();
        match &self.jdk_home {
            Some(home) => with_java_home(&env, home),
            None => env,
        }
    }

    fn reactor_package(&self, plan: &MavenPlan, env: &EnvMap) -> Result<String, BuildError> {
        let mut argv = plan.common.clone();
        argv.extend([
            "-f".to_string(),
            plan.root_pom.to_string_lossy().into_owned(),
            "-am".to_string(),
            "-pl".to_string(),
            plan.module_rel.clone(),
            "package".to_string(),
        ]);
        self.runner.run(&argv, &plan.reactor_dir, env)
    }

    fn standalone_package(&self, plan: &MavenPlan, env: &EnvMap) -> Result<String, BuildError> {
        let mut argv = plan.common.clone();
        argv.extend([
            "-f".to_string(),
            plan.module_pom.to_string_lossy().into_owned(),
            "package".to_string(),
        ]);
        self.runner.run(&argv, &plan.module_dir, env)
    }

    fn plugin_goal(&self, plan: &MavenPlan, env: &EnvMap, goal_args: &[&str]) -> Result<String, BuildError> {
        let mut argv = plan.common.clone();
        if plan.use_reactor {
            argv.extend([
                "-f".to_string(),
                plan.root_pom.to_string_lossy().into_owned(),
                "-am".to_string(),
                "-pl".to_string(),
                plan.module_rel.clone(),
            ]);
        } else {
            argv.extend([
                "-f".to_string(),
                plan.module_pom.to_string_lossy().into_owned(),
            ]);
        }
        argv.extend(goal_args.iter().map(|s| s.to_string()));
        let cwd = if plan.use_reactor {
            &plan.reactor_dir
        } else {
            &plan.module_dir
        };
        self.runner.run(&argv, cwd, env)
    }

    fn assembly_cli(&self, plan: &MavenPlan, env: &EnvMap) -> Result<String, BuildError> {
        self.plugin_goal(
            plan,
            env,
            &[
                ASSEMBLY_GOAL,
                "-DdescriptorRef=jar-with-dependencies",
                "-DappendAssemblyId=true",
                "-Dassembly.skipAssembly=false",
                "-DskipAssembly=false",
            ],
        )
    }

    fn shade(&self, plan: &MavenPlan, env: &EnvMap) -> Result<String, BuildError> {
        self.plugin_goal(
            plan,
            env,
            &[
                SHADE_GOAL,
                "-DcreateDependencyReducedPom=false",
                "-DshadedArtifactAttached=false",
            ],
        )
    }

    /// The package attempt: reactor first when a distinct reactor exists,
    /// standalone on a reactor-missing classification, one alternate-JDK
    /// retry on a version-mismatch classification. Bounded: every state runs
    /// at most twice.
    fn package_phase(&self, plan: &MavenPlan, base_env: &EnvMap) -> Result<(), BuildError> {
        if !plan.use_reactor {
            return self.package_with_jdk_retry(plan, base_env, Self::standalone_package);
        }

        match self.reactor_package(plan, base_env) {
            Ok(_) => Ok(()),
            Err(err) => {
                let reason = classify_maven_failure(err.output());
                debug!(code = %reason.code, "reactor package failed: {}", reason.detail);
                match reason.code {
                    MavenFailureCode::ReactorMissing => {
                        self.standalone_package(plan, base_env).map(|_| ())
                    }
                    code if code.is_jdk_mismatch() && self.alt_jdk_home.is_some() => {
                        let alt = self.alt_jdk_home.as_ref().map(|h| with_java_home(base_env, h));
                        let env_alt = alt.unwrap_or_else(|| base_env.clone());
                        match self.reactor_package(plan, &env_alt) {
                            Ok(_) => Ok(()),
                            Err(err2)
                                if classify_maven_failure(err2.output()).code
                                    == MavenFailureCode::ReactorMissing =>
                            {
                                self.standalone_package(plan, &env_alt).map(|_| ())
                            }
                            Err(err2) => Err(err2),
                        }
                    }
                    _ => Err(err),
                }
            }
        }
    }

    fn package_with_jdk_retry(
        &self,
        plan: &MavenPlan,
        base_env: &EnvMap,
        attempt: fn(&Self, &MavenPlan, &EnvMap) -> Result<String, BuildError>,
    ) -> Result<(), BuildError> {
        match attempt(self, plan, base_env) {
            Ok(_) => Ok(()),
            Err(err) => {
                let reason = classify_maven_failure(err.output());
                if reason.code.is_jdk_mismatch() {
                    if let Some(home) = &self.alt_jdk_home {
                        let env_alt = with_java_home(base_env, home);
                        return attempt(self, plan, &env_alt).map(|_| ());
                    }
                }
                Err(err)
            }
        }
    }

    fn log_failure(&self, stage: &str, err: &BuildError) {
        let reason = classify_maven_failure(err.output());
        warn!(stage, code = %reason.code, "{} failed: {}", stage, reason.detail);
    }

    /// Extra safety net over JarPicker: never hand back a test jar even when
    /// the generic classifier filter missed it.
    fn is_test_jar_name(name: &str) -> bool {
        let n = name.to_lowercase();
        n.ends_with("-tests.jar")
            || n.ends_with("-test.jar")
            || n.contains("test-fixtures")
            || n.contains("surefire")
            || n.contains("failsafe")
    }

    fn pick_best_non_test_jar(&self, jar_dir: &Path) -> Option<PathBuf> {
        let jars: Vec<PathBuf> = self
            .jar_picker
            .jars_by_mtime(jar_dir)
            .into_iter()
            .filter(|j| {
                let name = j
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                !["sources", "javadoc", "original-"].iter().any(|t| name.contains(t))
                    && !Self::is_test_jar_name(&name)
            })
            .collect();

        jars.iter().find(|j| self.jar_picker.is_fat(j)).cloned().or_else(|| jars.first().cloned())
    }

    fn current_pick(&self, plan: &MavenPlan) -> Option<PathBuf> {
        self.pick_best_non_test_jar(&plan.jar_dir)
            .or_else(|| self.jar_picker.pick_best(&plan.jar_dir))
    }

    pub fn build(
        &self,
        repo: &str,
        repo_root: &Path,
        module_dir: &Path,
    ) -> Result<PathBuf, BuildError> {
        let plan = self.plan(repo, repo_root, module_dir)?;
        let base_env = self.base_env();

        // 1) package, reactor then standalone, bounded JDK retry
        self.package_phase(&plan, &base_env)?;

        // 2) already fat => done
        if let Some(jar) = self.current_pick(&plan) {
            if self.jar_picker.is_fat(&jar) {
                return Ok(jar);
            }
        }

        // 3) assembly CLI; aggregator/parent modules legitimately reject this
        if let Err(err) = self.assembly_cli(&plan, &base_env) {
            self.log_failure("maven-assembly CLI (jar-with-dependencies)", &err);
        }
        if let Some(jar) = self.current_pick(&plan) {
            if jar_name_contains(&jar, "jar-with-dependencies") {
                return Ok(jar);
            }
        }

        // 4) patch the module pom, re-package, restore via guard
        {
            let _guard = PomPatcher::new().patch_scoped(&plan.module_pom)?;
            let result = if plan.use_reactor {
                self.reactor_package(&plan, &base_env)
            } else {
                self.standalone_package(&plan, &base_env)
            };
            if let Err(err) = result {
                self.log_failure("package after pom patch", &err);
            }
        }
        if let Some(jar) = self.current_pick(&plan) {
            if jar_name_contains(&jar, "jar-with-dependencies") {
                return Ok(jar);
            }
        }

        // 5) shade fallback, one alternate-JDK retry on version mismatch
        if let Err(err) = self.shade(&plan, &base_env) {
            self.log_failure("maven-shade", &err);
            let reason = classify_maven_failure(err.output());
            if reason.code.is_jdk_mismatch() {
                if let Some(home) = &self.alt_jdk_home {
                    let env_alt = with_java_home(&base_env, home);
                    if let Err(err2) = self.shade(&plan, &env_alt) {
                        self.log_failure("maven-shade (alternate JDK)", &err2);
                    }
                }
            }
        }

        // 6) final selection
        self.current_pick(&plan)
            .ok_or(BuildError::NoArtifact(plan.jar_dir))
    }
}

fn jar_name_contains(jar: &Path, needle: &str) -> bool {
    jar.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains(needle))
        .unwrap_or(false)
}

//! Maven failure classification
//!
//! A pure function from captured build output to a closed code. Drives which
//! fallback the cascade tries next; exit codes alone are useless once
//! packaging plugins are involved. Matching is ordered first-match-wins:
//! reactor-missing is deliberately checked before the JDK-version codes.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MavenFailureCode {
    /// Module absent from the reactor; retry standalone.
    ReactorMissing,
    /// Ran against an aggregator/non-jar module.
    PackagingNotJar,
    /// Assembly plugin invoked without descriptor configuration (typical for
    /// default-cli on a reactor/parent module).
    AssemblyNoDescriptors,
    /// Assembly plugin skipped by property or profile.
    AssemblySkipped,
    /// Module produced no main artifact.
    NoMainArtifact,
    /// Compiler release not supported by the current JDK; retry with the
    /// alternate JDK when configured.
    JdkTooOld,
    /// Enforcer/toolchain demands a different JDK; same retry as JdkTooOld.
    EnforcerJdk,
    /// Dependency resolution failed (missing artifact, repo, auth).
    DepsResolution,
    /// Expected, first-class outcome: message wording drifts across Maven
    /// versions and plugins, so plenty of real failures land here.
    Unknown,
}

impl fmt::Display for MavenFailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MavenFailureCode::ReactorMissing => "REACTOR_MISSING",
            MavenFailureCode::PackagingNotJar => "PACKAGING_NOT_JAR",
            MavenFailureCode::AssemblyNoDescriptors => "ASSEMBLY_NO_DESCRIPTORS",
            MavenFailureCode::AssemblySkipped => "ASSEMBLY_SKIPPED",
            MavenFailureCode::NoMainArtifact => "NO_MAIN_ARTIFACT",
            MavenFailureCode::JdkTooOld => "JDK_TOO_OLD",
            MavenFailureCode::EnforcerJdk => "ENFORCER_JDK",
            MavenFailureCode::DepsResolution => "DEPS_RESOLUTION",
            MavenFailureCode::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl MavenFailureCode {
    /// True for codes that warrant one retry under the alternate JDK.
    pub fn is_jdk_mismatch(&self) -> bool {
        matches!(self, MavenFailureCode::JdkTooOld | MavenFailureCode::EnforcerJdk)
    }
}

#[derive(Debug, Clone)]
pub struct MavenFailure {
    pub code: MavenFailureCode,
    pub detail: String,
}

pub fn classify_maven_failure(out: &str) -> MavenFailure {
    let o = out.to_lowercase();

    if o.contains("could not find the selected project in the reactor") {
        return failure(
            MavenFailureCode::ReactorMissing,
            "Module not in reactor (-pl mismatch or wrong root pom).",
        );
    }

    if o.contains("packaging pom") || o.contains("is not a jar") {
        return failure(
            MavenFailureCode::PackagingNotJar,
            "Ran on an aggregator/non-jar module.",
        );
    }

    if o.contains("no assembly descriptors found") {
        return failure(
            MavenFailureCode::AssemblyNoDescriptors,
            "Assembly plugin ran without descriptor configuration.",
        );
    }

    if o.contains("skipassembly") && (o.contains("true") || o.contains("skipping")) {
        return failure(
            MavenFailureCode::AssemblySkipped,
            "Assembly plugin appears skipped by property/profile.",
        );
    }

    if o.contains("the project has not been built yet") || o.contains("no file assigned to build artifact")
    {
        return failure(
            MavenFailureCode::NoMainArtifact,
            "Module did not produce a main artifact (no jar).",
        );
    }

    if o.contains("release version") && o.contains("not supported") {
        return failure(
            MavenFailureCode::JdkTooOld,
            "Compiler release not supported by current JDK.",
        );
    }

    if o.contains("requires at least jdk")
        || o.contains("minimum java version")
        || o.contains("requirejavaversion")
        || o.contains("maven-enforcer-plugin")
    {
        return failure(
            MavenFailureCode::EnforcerJdk,
            "Enforcer/toolchain requires a different JDK.",
        );
    }

    if o.contains("could not resolve dependencies") || o.contains("could not find artifact") {
        return failure(
            MavenFailureCode::DepsResolution,
            "Dependency resolution failed (missing artifact/repo/auth).",
        );
    }

    MavenFailure {
        code: MavenFailureCode::Unknown,
        detail: format!("Could not classify. Tail:\n{}", error_tail(out)),
    }
}

fn failure(code: MavenFailureCode, detail: &str) -> MavenFailure {
    MavenFailure {
        code,
        detail: detail.to_string(),
    }
}

/// The last ~15 error-bearing lines of the output, or the last 20 lines when
/// nothing looks like an error.
fn error_tail(out: &str) -> String {
    let error_lines: Vec<&str> = out
        .lines()
        .filter(|line| {
            let l = line.to_lowercase();
            l.contains("error") || l.contains("failed")
        })
        .collect();
    let tail: Vec<&str> = if error_lines.is_empty() {
        let all: Vec<&str> = out.lines().collect();
        all.iter().rev().take(20).rev().copied().collect()
    } else {
        error_lines.iter().rev().take(15).rev().copied().collect()
    };
    tail.join("\n")
}

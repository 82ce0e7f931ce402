//! jarsmith - resilient fat-jar builder for arbitrary repositories
//!
//! Given a target class inside an arbitrary, uncontrolled open-source
//! repository, jarsmith produces a single self-contained "fat" jar (the class
//! plus all runtime dependencies). Input repositories are heterogeneous,
//! frequently broken, and built with unpredictable plugin configurations, so
//! a single build invocation essentially never succeeds uniformly; the crate
//! is built around a resilient build-resolution engine instead:
//!
//! - **Discovery**: [`build_root::BuildRootDetector`] locates the module and,
//!   for Maven, the best aggregator descriptor for reactor-relative builds
//! - **Execution**: [`command::CommandRunner`] drives the external build tool
//!   with an explicit environment map and persists every invocation's output
//! - **Strategy cascades**: [`maven::MavenFatJarBuilder`] and
//!   [`gradle::GradleFatJarBuilder`] try a fixed, bounded sequence of build
//!   strategies, using failure classification of captured output to pick the
//!   next step
//! - **Selection**: [`jars::JarPicker`] ranks produced archives, preferring
//!   names that look like fat jars
//! - **Orchestration**: [`orchestrator::BuildOrchestrator`] deduplicates
//!   requests per module, builds each module exactly once, and fans the
//!   outcome back out to every request
//!
//! The engine never implements a build system itself: it only reasons about
//! the exit status and textual output of unmodified external tools, and it
//! always terminates with an artifact, an explicit skip reason, or a failure.

pub mod build_root;
pub mod cli;
pub mod command;
pub mod config;
pub mod dataset;
pub mod error;
pub mod gradle;
pub mod jars;
pub mod maven;
pub mod model;
pub mod orchestrator;
pub mod scan;
pub mod wrapper;

pub use build_root::BuildRootDetector;
pub use command::{env_snapshot, with_java_home, CommandRunner, EnvMap};
pub use config::{BuildConfig, RunMode, DEFAULT_SKIP_REPOS};
pub use error::BuildError;
pub use gradle::GradleFatJarBuilder;
pub use jars::JarPicker;
pub use maven::{MavenFatJarBuilder, PomPatcher};
pub use model::{BuildOutcome, BuildRecord, BuildRequest, BuildTool, ModuleKey, Resolution};
pub use orchestrator::{BuildOrchestrator, ModuleBuilder, RunSummary};
pub use scan::RepoScanner;
pub use wrapper::WrapperSelector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_jarsmith() {
        assert_eq!(NAME, "jarsmith");
    }
}

//! Error vocabulary of the build-resolution engine
//!
//! The engine distinguishes three terminal outcomes for a module: an artifact,
//! an explicit skip, and a generic failure. `BuildError` carries everything the
//! orchestrator needs to make that call; process output is always retained so a
//! failure can be classified and triaged without re-running the build tool.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// An external build-tool invocation exited non-zero. The combined
    /// stdout/stderr text is kept for failure classification.
    #[error("command `{program}` failed with exit code {code}")]
    CommandFailed {
        program: String,
        code: i32,
        output: String,
    },

    /// The engine determined with high confidence that no strategy can
    /// succeed for this module (hard JDK incompatibility, unresolvable
    /// dependency artifact, ...). Distinct from a generic failure.
    #[error("build skipped: {0}")]
    Skip(String),

    /// Neither a usable wrapper nor a system-installed build tool exists.
    #[error("required build tool not found on PATH: {0}")]
    ToolNotFound(String),

    /// No Maven or Gradle descriptor anywhere in the repository.
    #[error("no pom.xml or build.gradle(.kts) found under {0}")]
    NoBuildRoot(PathBuf),

    /// Every strategy ran but the output directory yields no eligible jar.
    #[error("no jars produced under {0}")]
    NoArtifact(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Captured process output, when this error carries any.
    pub fn output(&self) -> &str {
        match self {
            BuildError::CommandFailed { output, .. } => output,
            _ => "",
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, BuildError::Skip(_))
    }
}

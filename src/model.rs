//! Core data model: build requests, resolved records, module keys, outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The two supported build-tool families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildTool {
    Maven,
    Gradle,
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTool::Maven => write!(f, "maven"),
            BuildTool::Gradle => write!(f, "gradle"),
        }
    }
}

/// Uniquely identifies one buildable unit. Two build requests that map to the
/// same key share exactly one build attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleKey {
    pub repo: String,
    pub tool: BuildTool,
    pub module_rel: String,
}

/// One row of input: a target class inside a repository. Carries no
/// build-tool knowledge yet.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRequest {
    pub repo: String,
    pub class_path: String,
    #[serde(default)]
    pub test_paths: String,
}

/// How a request resolved: to a concrete build tool, or to one of the two
/// skip markers written verbatim into the output dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Tool(BuildTool),
    /// Repository exists but no build root was found (or the clone is absent).
    Skip,
    /// Repository is on the unconditional skip list.
    SkipRepo,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Tool(t) => t.fmt(f),
            Resolution::Skip => write!(f, "SKIP"),
            Resolution::SkipRepo => write!(f, "SKIP-REPO"),
        }
    }
}

/// A request annotated with resolution metadata. Produced 1:1 per input row
/// regardless of whether the module build later succeeds.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub repo: String,
    pub class_path: String,
    pub test_paths: String,
    pub resolution: Resolution,
    pub module_rel: String,
    pub fqcn: String,
}

impl BuildRecord {
    /// The module key this record's build attempt is shared under, when the
    /// request resolved to a buildable module.
    pub fn module_key(&self) -> Option<ModuleKey> {
        match self.resolution {
            Resolution::Tool(tool) => Some(ModuleKey {
                repo: self.repo.clone(),
                tool,
                module_rel: self.module_rel.clone(),
            }),
            _ => None,
        }
    }
}

/// Terminal outcome of one module's strategy cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Artifact(PathBuf),
    Skip(String),
    Fail,
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Artifact(p) => write!(f, "{}", p.display()),
            BuildOutcome::Skip(reason) => write!(f, "SKIP: {}", reason),
            BuildOutcome::Fail => write!(f, "FAIL"),
        }
    }
}

/// Mapping from a repository identifier to its already-cloned local root,
/// produced by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRoot {
    pub repo: String,
    pub repo_root: PathBuf,
}

/// Derives a fully-qualified class name from a `src/main/java`-relative
/// source path. Returns `None` for anything that does not look like a main
/// Java source file.
pub fn infer_fqcn_from_path(class_path: &str) -> Option<String> {
    let p = class_path.replace('\\', "/");
    let marker = "/src/main/java/";
    let rel = p.split_once(marker).map(|(_, rest)| rest)?;
    let rel = rel.strip_suffix(".java")?;
    Some(rel.replace('/', "."))
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`, collapsing
/// runs, so repository and module names are usable as directory names.
pub fn safe_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sub = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            last_was_sub = false;
        } else if !last_was_sub {
            out.push('_');
            last_was_sub = true;
        }
    }
    out
}

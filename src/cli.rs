//! Command-line argument types

use crate::config::{BuildConfig, RunMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Resilient fat-jar builder for heterogeneous Maven and Gradle repositories
#[derive(Parser, Debug)]
#[command(
    name = "jarsmith",
    about = "Builds self-contained fat jars for target classes in arbitrary repositories",
    version,
    long_about = "jarsmith resolves each (repository, class path) request to its build \
                  module, then drives Maven or Gradle through a bounded cascade of build \
                  strategies until a fat jar is produced, the module is skipped with an \
                  explicit reason, or the cascade is exhausted."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build fat jars for every request in a dataset",
        long_about = "Reads a row-oriented dataset of (repo, class_path, test_paths) \
                      requests, builds each distinct module once, and writes a mapping \
                      dataset from every request to its artifact path or skip/fail marker.\n\n\
                      Examples:\n  \
                      jarsmith build selected_classes.csv\n  \
                      jarsmith build selected_classes.csv --base-dir /work --alt-jdk-home /opt/jdk21"
    )]
    Build(BuildArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Local,
    Docker,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(value_name = "REQUESTS_CSV", help = "Input dataset, one row per target class")]
    pub requests_csv: PathBuf,

    #[arg(long, value_enum, default_value = "local", help = "Execution mode")]
    pub mode: ModeArg,

    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Base directory for repos/out/cache (local mode only)"
    )]
    pub base_dir: PathBuf,

    #[arg(long, value_name = "DIR", help = "Default JDK home for build invocations")]
    pub jdk_home: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Alternate JDK home, used only for version-mismatch retries"
    )]
    pub alt_jdk_home: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Per-invocation log directory override")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Repository clone-roots dataset override")]
    pub repos_csv: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Output mapping dataset override")]
    pub out_map_csv: Option<PathBuf>,

    #[arg(
        long = "skip-repo",
        value_name = "REPO",
        help = "Additional repository to skip unconditionally (repeatable)"
    )]
    pub skip_repos: Vec<String>,
}

impl BuildArgs {
    pub fn to_config(&self) -> BuildConfig {
        let mut cfg = BuildConfig::new(self.requests_csv.clone());
        cfg.mode = match self.mode {
            ModeArg::Local => RunMode::Local,
            ModeArg::Docker => RunMode::Docker,
        };
        cfg.base_dir = self.base_dir.clone();
        cfg.jdk_home = self.jdk_home.clone();
        cfg.alt_jdk_home = self.alt_jdk_home.clone();
        cfg.log_dir = self.log_dir.clone();
        cfg.repos_csv = self.repos_csv.clone();
        cfg.out_map_csv = self.out_map_csv.clone();
        cfg.skip_repos.extend(self.skip_repos.iter().cloned());
        cfg
    }
}

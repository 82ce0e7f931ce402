//! External process execution with captured diagnostics
//!
//! Every invocation gets a monotonically increasing sequence number and three
//! persisted artifacts (stdout, stderr, combined) under a directory keyed by
//! the current (repository, module) context. The environment is an explicit
//! map handed to the spawn call; ambient process state is never mutated, so
//! per-invocation JDK and cache-home overrides cannot leak across modules.

use crate::error::BuildError;
use crate::model::safe_name;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, error, info};

/// Explicit per-invocation environment.
pub type EnvMap = BTreeMap<String, String>;

/// Snapshot of the current process environment as a starting point for
/// per-invocation copies.
pub fn env_snapshot() -> EnvMap {
    std::env::vars().collect()
}

/// Copy of `env` with `JAVA_HOME` set to `home` and `<home>/bin` prepended to
/// `PATH`, so wrapper scripts and `mvn`/`gradle` resolve the same JDK.
pub fn with_java_home(env: &EnvMap, home: &Path) -> EnvMap {
    let mut out = env.clone();
    out.insert("JAVA_HOME".to_string(), home.to_string_lossy().into_owned());

    let mut paths = vec![home.join("bin")];
    if let Some(old) = env.get("PATH") {
        paths.extend(std::env::split_paths(old));
    }
    if let Ok(joined) = std::env::join_paths(paths) {
        out.insert("PATH".to_string(), joined.to_string_lossy().into_owned());
    }
    out
}

#[derive(Debug, Default)]
struct LogContext {
    repo: String,
    module_rel: String,
}

#[derive(Debug)]
pub struct CommandRunner {
    log_root: PathBuf,
    seq: AtomicU64,
    ctx: Mutex<LogContext>,
}

impl CommandRunner {
    pub fn new(log_root: PathBuf) -> Self {
        Self {
            log_root,
            seq: AtomicU64::new(0),
            ctx: Mutex::new(LogContext {
                repo: "unknown_repo".to_string(),
                module_rel: "root".to_string(),
            }),
        }
    }

    /// Routes subsequent invocation logs to the given (repo, module) subtree.
    pub fn set_context(&self, repo: &str, module_rel: &str) {
        let mut ctx = self.ctx.lock().expect("log context poisoned");
        ctx.repo = if repo.is_empty() { "unknown_repo" } else { repo }.to_string();
        ctx.module_rel = if module_rel.is_empty() { "root" } else { module_rel }.to_string();
    }

    fn log_dir(&self) -> PathBuf {
        let ctx = self.ctx.lock().expect("log context poisoned");
        self.log_root
            .join(safe_name(&ctx.repo))
            .join(safe_name(&ctx.module_rel))
    }

    /// Runs `argv` in `cwd` with exactly the environment in `env`, returning
    /// the combined output on exit code zero.
    pub fn run(&self, argv: &[String], cwd: &Path, env: &EnvMap) -> Result<String, BuildError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let display_cmd = argv.join(" ");
        info!(seq, cwd = %cwd.display(), "run: {}", display_cmd);

        let (program, args) = argv.split_first().ok_or_else(|| {
            BuildError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty argv",
            ))
        })?;

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env_clear()
            .envs(env)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let combined = combine(&stdout, &stderr);

        self.persist(seq, argv, &stdout, &stderr, &combined);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let tail: String = tail_chars(&combined, 4000);
            error!(seq, code, "command failed: {}", display_cmd);
            debug!(seq, "---- tail ----\n{}", tail);
            return Err(BuildError::CommandFailed {
                program: program.clone(),
                code,
                output: combined,
            });
        }

        debug!(seq, "command ok: {}", display_cmd);
        Ok(combined)
    }

    fn persist(&self, seq: u64, argv: &[String], stdout: &str, stderr: &str, combined: &str) {
        let first = argv
            .first()
            .map(|p| {
                Path::new(p)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.clone())
            })
            .unwrap_or_else(|| "cmd".to_string());
        let last = argv.last().cloned().unwrap_or_else(|| "cmd".to_string());
        let stem = format!("{:04}_{}_{}", seq, safe_name(&first), safe_name(&last));

        let dir = self.log_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            error!(dir = %dir.display(), error = %e, "cannot create log dir");
            return;
        }
        for (suffix, text) in [
            ("stdout", stdout),
            ("stderr", stderr),
            ("combined", combined),
        ] {
            let path = dir.join(format!("{}.{}.log", stem, suffix));
            if let Err(e) = fs::write(&path, text) {
                error!(path = %path.display(), error = %e, "cannot persist log");
            }
        }
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        return stdout.to_string();
    }
    if stdout.is_empty() {
        return stderr.to_string();
    }
    if stdout.ends_with('\n') {
        format!("{}{}", stdout, stderr)
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_run_captures_combined_output() {
        let tmp = TempDir::new().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let out = runner
            .run(&sh("echo one; echo two >&2"), tmp.path(), &env_snapshot())
            .unwrap();
        assert!(out.contains("one"));
        assert!(out.contains("two"));
    }

    #[test]
    fn test_run_persists_three_logs_per_invocation() {
        let tmp = TempDir::new().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        runner.set_context("acme/widget", "core/impl");
        runner
            .run(&sh("echo hello"), tmp.path(), &env_snapshot())
            .unwrap();

        let dir = tmp.path().join("logs/acme_widget/core_impl");
        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| n.starts_with("0001_sh_")));
        assert!(names.iter().any(|n| n.ends_with(".stdout.log")));
        assert!(names.iter().any(|n| n.ends_with(".stderr.log")));
        assert!(names.iter().any(|n| n.ends_with(".combined.log")));
    }

    #[test]
    fn test_run_failure_keeps_output() {
        let tmp = TempDir::new().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let err = runner
            .run(&sh("echo boom >&2; exit 3"), tmp.path(), &env_snapshot())
            .unwrap_err();
        match err {
            BuildError::CommandFailed { code, output, .. } => {
                assert_eq!(code, 3);
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let tmp = TempDir::new().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        runner.run(&sh("true"), tmp.path(), &env_snapshot()).unwrap();
        runner.run(&sh("true"), tmp.path(), &env_snapshot()).unwrap();

        let dir = tmp.path().join("logs/unknown_repo/root");
        let mut names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert!(names.first().unwrap().starts_with("0001_"));
        assert!(names.last().unwrap().starts_with("0002_"));
    }

    #[test]
    fn test_with_java_home_does_not_touch_ambient_env() {
        let base = env_snapshot();
        let env = with_java_home(&base, Path::new("/opt/jdk21"));
        assert_eq!(env.get("JAVA_HOME").map(String::as_str), Some("/opt/jdk21"));
        assert!(env.get("PATH").unwrap().starts_with("/opt/jdk21/bin"));
        // the snapshot and the real environment are untouched
        assert_eq!(base.get("JAVA_HOME"), env_snapshot().get("JAVA_HOME"));
    }

    #[test]
    fn test_env_is_explicit_not_inherited() {
        let tmp = TempDir::new().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let mut env = env_snapshot();
        env.insert("JARSMITH_PROBE".to_string(), "42".to_string());
        let out = runner
            .run(&sh("echo probe=$JARSMITH_PROBE"), tmp.path(), &env)
            .unwrap();
        assert!(out.contains("probe=42"));
    }
}

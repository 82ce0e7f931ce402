//! Last-resort pom patching
//!
//! Injects a maven-assembly-plugin binding into a module descriptor so a
//! plain `package` produces a jar-with-dependencies. The patch is strictly
//! scoped: the original bytes are backed up before the write and restored by
//! a guard when the build attempt finishes, however it finishes. Text
//! patching on purpose; descriptor XML in uncontrolled repositories is too
//! irregular for round-tripping through a real XML writer.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ASSEMBLY_PLUGIN_XML: &str = r#"<plugin>
  <groupId>org.apache.maven.plugins</groupId>
  <artifactId>maven-assembly-plugin</artifactId>
  <version>3.6.0</version>
  <configuration>
    <descriptorRefs>
      <descriptorRef>jar-with-dependencies</descriptorRef>
    </descriptorRefs>
    <appendAssemblyId>true</appendAssemblyId>
  </configuration>
  <executions>
    <execution>
      <id>make-assembly</id>
      <phase>package</phase>
      <goals>
        <goal>single</goal>
      </goals>
    </execution>
  </executions>
</plugin>"#;

const BACKUP_SUFFIX: &str = ".bak_fatjar";

/// Result of a patch attempt. `changed == false` means the descriptor already
/// carried the plugin (no backup exists, restore is a no-op).
#[derive(Debug, Clone)]
pub struct PatchState {
    pub changed: bool,
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Default, Clone)]
pub struct PomPatcher;

impl PomPatcher {
    pub fn new() -> Self {
        Self
    }

    /// Ensures the descriptor binds the assembly plugin to `package`,
    /// patching it if necessary. Callers must restore every `changed` state
    /// exactly once; prefer [`Self::patch_scoped`] which ties the restore to
    /// a guard.
    pub fn ensure_assembly_plugin(&self, pom: &Path) -> io::Result<PatchState> {
        let txt = fs::read_to_string(pom)?;

        if txt.contains("maven-assembly-plugin") && txt.contains("jar-with-dependencies") {
            return Ok(PatchState {
                changed: false,
                backup: None,
            });
        }

        let backup = backup_path(pom);
        fs::write(&backup, &txt)?;

        let in_plugins = Regex::new(r"(?s)(<build>.*?<plugins>)(.*?)(</plugins>.*?</build>)")
            .expect("valid regex");
        let in_build = Regex::new(r"(?s)(<build>)(.*?)(</build>)").expect("valid regex");
        let before_close = Regex::new(r"</project>").expect("valid regex");

        let patched = if in_plugins.is_match(&txt) {
            in_plugins
                .replace(&txt, |caps: &regex::Captures<'_>| {
                    format!("{}{}\n{}\n{}", &caps[1], &caps[2], ASSEMBLY_PLUGIN_XML, &caps[3])
                })
                .into_owned()
        } else if in_build.is_match(&txt) {
            in_build
                .replace(&txt, |caps: &regex::Captures<'_>| {
                    format!(
                        "{}{}\n<plugins>\n{}\n</plugins>\n{}",
                        &caps[1], &caps[2], ASSEMBLY_PLUGIN_XML, &caps[3]
                    )
                })
                .into_owned()
        } else {
            before_close
                .replace(
                    &txt,
                    format!(
                        "<build>\n<plugins>\n{}\n</plugins>\n</build>\n</project>",
                        ASSEMBLY_PLUGIN_XML
                    ),
                )
                .into_owned()
        };

        fs::write(pom, patched)?;
        Ok(PatchState {
            changed: true,
            backup: Some(backup),
        })
    }

    /// Rewrites the original bytes and discards the backup. No-op for
    /// unchanged states.
    pub fn restore(&self, pom: &Path, state: &PatchState) -> io::Result<()> {
        if !state.changed {
            return Ok(());
        }
        if let Some(backup) = &state.backup {
            if backup.is_file() {
                let original = fs::read(backup)?;
                fs::write(pom, original)?;
                fs::remove_file(backup)?;
            }
        }
        Ok(())
    }

    /// Patches the descriptor and returns a guard whose drop restores it, so
    /// the restore runs on every exit path of the enclosing build attempt.
    pub fn patch_scoped(&self, pom: &Path) -> io::Result<PomPatchGuard> {
        let state = self.ensure_assembly_plugin(pom)?;
        if state.changed {
            info!(pom = %pom.display(), "temporarily injected maven-assembly-plugin");
        }
        Ok(PomPatchGuard {
            patcher: self.clone(),
            pom: pom.to_path_buf(),
            state,
        })
    }
}

fn backup_path(pom: &Path) -> PathBuf {
    let mut name = pom
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pom.xml".to_string());
    name.push_str(BACKUP_SUFFIX);
    pom.with_file_name(name)
}

/// Holds a patched descriptor; restores the original content on drop.
#[derive(Debug)]
pub struct PomPatchGuard {
    patcher: PomPatcher,
    pom: PathBuf,
    state: PatchState,
}

impl PomPatchGuard {
    pub fn changed(&self) -> bool {
        self.state.changed
    }
}

impl Drop for PomPatchGuard {
    fn drop(&mut self) {
        match self.patcher.restore(&self.pom, &self.state) {
            Ok(()) if self.state.changed => {
                info!(pom = %self.pom.display(), "restored original pom");
            }
            Ok(()) => {}
            Err(e) => {
                warn!(pom = %self.pom.display(), error = %e, "failed to restore pom");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pom(dir: &Path, content: &str) -> PathBuf {
        let pom = dir.join("pom.xml");
        fs::write(&pom, content).unwrap();
        pom
    }

    #[test]
    fn test_noop_when_plugin_already_declared() {
        let tmp = TempDir::new().unwrap();
        let pom = write_pom(
            tmp.path(),
            "<project><build><plugins><plugin>\
             <artifactId>maven-assembly-plugin</artifactId>\
             <configuration><descriptorRefs><descriptorRef>jar-with-dependencies</descriptorRef>\
             </descriptorRefs></configuration></plugin></plugins></build></project>",
        );
        let before = fs::read(&pom).unwrap();

        let state = PomPatcher::new().ensure_assembly_plugin(&pom).unwrap();
        assert!(!state.changed);
        assert!(state.backup.is_none());
        assert_eq!(fs::read(&pom).unwrap(), before);
        assert!(!backup_path(&pom).exists());
    }

    #[test]
    fn test_patch_into_existing_plugins_block() {
        let tmp = TempDir::new().unwrap();
        let pom = write_pom(
            tmp.path(),
            "<project>\n<build>\n<plugins>\n<plugin><artifactId>x</artifactId></plugin>\n</plugins>\n</build>\n</project>\n",
        );

        let patcher = PomPatcher::new();
        let state = patcher.ensure_assembly_plugin(&pom).unwrap();
        assert!(state.changed);

        let patched = fs::read_to_string(&pom).unwrap();
        assert!(patched.contains("maven-assembly-plugin"));
        // inserted inside the existing block, not a second one
        assert_eq!(patched.matches("<plugins>").count(), 1);
    }

    #[test]
    fn test_patch_creates_plugins_inside_build() {
        let tmp = TempDir::new().unwrap();
        let pom = write_pom(
            tmp.path(),
            "<project>\n<build>\n<finalName>app</finalName>\n</build>\n</project>\n",
        );

        PomPatcher::new().ensure_assembly_plugin(&pom).unwrap();
        let patched = fs::read_to_string(&pom).unwrap();
        assert!(patched.contains("<plugins>"));
        assert!(patched.contains("maven-assembly-plugin"));
        assert_eq!(patched.matches("<build>").count(), 1);
    }

    #[test]
    fn test_patch_creates_build_before_project_close() {
        let tmp = TempDir::new().unwrap();
        let pom = write_pom(tmp.path(), "<project>\n<artifactId>app</artifactId>\n</project>\n");

        PomPatcher::new().ensure_assembly_plugin(&pom).unwrap();
        let patched = fs::read_to_string(&pom).unwrap();
        assert!(patched.contains("<build>\n<plugins>"));
        assert!(patched.trim_end().ends_with("</project>"));
    }

    #[test]
    fn test_restore_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let original = "<project>\n  <artifactId>app</artifactId>\n</project>\n";
        let pom = write_pom(tmp.path(), original);

        let patcher = PomPatcher::new();
        let state = patcher.ensure_assembly_plugin(&pom).unwrap();
        assert_ne!(fs::read_to_string(&pom).unwrap(), original);

        patcher.restore(&pom, &state).unwrap();
        assert_eq!(fs::read_to_string(&pom).unwrap(), original);
        assert!(!backup_path(&pom).exists());
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let tmp = TempDir::new().unwrap();
        let original = "<project></project>";
        let pom = write_pom(tmp.path(), original);

        {
            let guard = PomPatcher::new().patch_scoped(&pom).unwrap();
            assert!(guard.changed());
            assert_ne!(fs::read_to_string(&pom).unwrap(), original);
        }
        assert_eq!(fs::read_to_string(&pom).unwrap(), original);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let tmp = TempDir::new().unwrap();
        let original = "<project></project>";
        let pom = write_pom(tmp.path(), original);
        let pom_clone = pom.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = PomPatcher::new().patch_scoped(&pom_clone).unwrap();
            panic!("build attempt exploded");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&pom).unwrap(), original);
    }
}

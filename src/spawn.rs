//! Launching external programs
//!
//! Programs started by cardboard (the config script, `exec` commands) run
//! detached in their own process group with the compositor's environment plus
//! the variables set through [`Spawner::set_env`]. Only a failure to start the
//! program is reported; its exit status is collected later by [`Spawner::reap`]
//! and merely logged.

use log::{debug, info, warn};
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("no program given")]
    EmptyCommand,
    #[error("couldn't execute {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct Spawner {
    env: Vec<(OsString, OsString)>,
    children: Vec<Child>,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable to the environment of every program spawned from now on.
    pub fn set_env(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
    }

    /// Starts `argv[0]` with the remaining arguments. Returns the child's pid.
    pub fn spawn<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<u32, SpawnError> {
        let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
        let program = program.as_ref();
        if program.is_empty() {
            return Err(SpawnError::EmptyCommand);
        }

        let mut command = Command::new(program);
        command.args(args.iter().map(|a| a.as_ref()));
        self.launch(program, command)
    }

    /// Runs the user's config script, which is expected to be executable.
    pub fn spawn_script(&mut self, path: &Path) -> Result<u32, SpawnError> {
        let program = path.display().to_string();
        self.launch(&program, Command::new(path))
    }

    fn launch(&mut self, program: &str, mut command: Command) -> Result<u32, SpawnError> {
        command
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .process_group(0);

        let child = command.spawn().map_err(|source| SpawnError::Exec {
            program: program.to_string(),
            source,
        })?;

        let pid = child.id();
        info!("🚀 Spawned {} (pid {})", program, pid);
        self.children.push(child);
        Ok(pid)
    }

    /// Collects children that have exited, without blocking. Returns how many were reaped.
    pub fn reap(&mut self) -> usize {
        let before = self.children.len();
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Child {} exited with {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("⚠️ Failed to poll child {}: {}", child.id(), e);
                false
            }
        });
        before - self.children.len()
    }

    /// Number of spawned children not reaped yet.
    pub fn running(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn reap_all(spawner: &mut Spawner) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while spawner.running() > 0 && Instant::now() < deadline {
            spawner.reap();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut spawner = Spawner::new();
        assert!(matches!(spawner.spawn::<&str>(&[]), Err(SpawnError::EmptyCommand)));
        assert!(matches!(spawner.spawn(&[""]), Err(SpawnError::EmptyCommand)));
    }

    #[test]
    fn test_missing_program_reports_exec_failure() {
        let mut spawner = Spawner::new();
        let err = spawner.spawn(&["/nonexistent/cardboard-test-program"]);
        assert!(matches!(err, Err(SpawnError::Exec { .. })));
        assert_eq!(spawner.running(), 0);
    }

    #[test]
    fn test_children_are_reaped() -> anyhow::Result<()> {
        let mut spawner = Spawner::new();
        spawner.spawn(&["true"])?;
        assert_eq!(spawner.running(), 1);

        reap_all(&mut spawner);
        assert_eq!(spawner.running(), 0);
        Ok(())
    }

    #[test]
    fn test_environment_is_passed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("env");

        let mut spawner = Spawner::new();
        spawner.set_env("CARDBOARD_TEST_VALUE", "first");
        spawner.set_env("CARDBOARD_TEST_VALUE", "second");
        let script = format!("printf %s \"$CARDBOARD_TEST_VALUE\" > {}", out.display());
        spawner.spawn(&["sh", "-c", script.as_str()])?;
        reap_all(&mut spawner);

        assert_eq!(std::fs::read_to_string(&out)?, "second");
        Ok(())
    }
}

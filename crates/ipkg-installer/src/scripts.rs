use std::fmt;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    Install,
    Remove,
}

impl ScriptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for ScriptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an install script run needs to know.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInvocation<'a> {
    pub script: &'a Path,
    /// Package contents to install from. Absent for removal.
    pub work_dir: Option<&'a Path>,
    pub install_dir: &'a Path,
    /// Where the script records the links it wants created.
    pub activation_log: &'a Path,
    pub mode: ScriptMode,
}

/// Runs a package's install script.
pub trait ScriptInterpreter {
    fn run(&self, invocation: &ScriptInvocation<'_>) -> Result<()>;
}

/// Runs a package's platform build script and returns its output.
pub trait BuildRunner {
    fn build(&self, script: &Path, work_dir: &Path) -> Result<String>;
}

/// Executes the install script as a program:
/// `<script> <mode> <install_dir>`, from the work dir when there is one.
///
/// The same values are exported as `IPKG_MODE`, `IPKG_WORK_DIR`,
/// `IPKG_INSTALL_DIR` and `IPKG_ACTIVATION_LOG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInterpreter;

impl ScriptInterpreter for ProcessInterpreter {
    fn run(&self, invocation: &ScriptInvocation<'_>) -> Result<()> {
        let current_dir = invocation.work_dir.unwrap_or(invocation.install_dir);
        let mut command = Command::new(invocation.script);
        command
            .arg(invocation.mode.as_str())
            .arg(invocation.install_dir)
            .current_dir(current_dir)
            .env("IPKG_MODE", invocation.mode.as_str())
            .env("IPKG_INSTALL_DIR", invocation.install_dir)
            .env("IPKG_ACTIVATION_LOG", invocation.activation_log);
        if let Some(work_dir) = invocation.work_dir {
            command.env("IPKG_WORK_DIR", work_dir);
        }

        debug!(
            script = %invocation.script.display(),
            mode = %invocation.mode,
            "running install script"
        );
        run_command(
            &mut command,
            &format!("{} script {}", invocation.mode, invocation.script.display()),
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBuildRunner;

impl BuildRunner for ProcessBuildRunner {
    fn build(&self, script: &Path, work_dir: &Path) -> Result<String> {
        let mut command = Command::new(script);
        command.current_dir(work_dir);
        debug!(script = %script.display(), "running build script");
        run_command(&mut command, &format!("build script {}", script.display()))
    }
}

/// Runs `command` to completion and returns its stdout.
pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

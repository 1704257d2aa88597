//! Subprocess execution.
//!
//! Every command built here runs with an explicit working directory when one
//! is set; nothing in the crate changes the process-wide current directory.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (k, v) in vars {
            self.env.insert(k.as_ref().to_string(), v.as_ref().to_string());
        }
        self
    }

    /// Set the working directory of the child.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run the command to completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        debug!("running `{}`", self.display_command());
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }

    /// Run the command and fail on a non-zero exit status.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr.trim_end()
            );
        }
        Ok(output)
    }

    /// Run the command, fail on error, and return stdout as text.
    pub fn exec_stdout(&self) -> Result<String> {
        let output = self.exec_and_check()?;
        String::from_utf8(output.stdout)
            .with_context(|| format!("`{}` produced non UTF-8 output", self.display_command()))
    }

    /// Render the command line for logs and errors.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Locate `uv`, honouring the `UV` environment variable.
pub fn find_uv() -> Option<PathBuf> {
    if let Ok(uv) = std::env::var("UV") {
        if let Some(path) = find_executable(&uv) {
            return Some(path);
        }
    }
    find_executable("uv")
}

/// Locate a Python 3 interpreter on PATH.
pub fn find_python() -> Option<PathBuf> {
    ["python3", "python"]
        .iter()
        .find_map(|name| find_executable(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_exec_uses_explicit_cwd() {
        let tmp = TempDir::new().unwrap();
        let out = ProcessBuilder::new("pwd").cwd(tmp.path()).exec_stdout().unwrap();
        let reported = PathBuf::from(out.trim()).canonicalize().unwrap();
        assert_eq!(reported, tmp.path().canonicalize().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_and_check_reports_failure() {
        let err = ProcessBuilder::new("sh")
            .args(["-c", "echo nope >&2; exit 3"])
            .exec_and_check()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit code Some(3)"));
        assert!(msg.contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_is_passed() {
        let out = ProcessBuilder::new("sh")
            .args(["-c", "printf %s \"$PSPROJECT_PLATFORM\""])
            .env("PSPROJECT_PLATFORM", "iOS")
            .exec_stdout()
            .unwrap();
        assert_eq!(out, "iOS");
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("python3").args(["-m", "pip", "install", "-r", "my reqs.txt"]);
        assert_eq!(pb.display_command(), "python3 -m pip install -r \"my reqs.txt\"");
    }
}

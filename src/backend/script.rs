//! Shell hooks declared by backend descriptors.

use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::util::process::ProcessBuilder;

/// Script kind. Only shell scripts exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Shell,
}

/// Interpreter running a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Python,
    Bash,
    Zsh,
    #[default]
    Sh,
    Ruby,
    Fish,
}

impl ShellType {
    pub fn program(&self) -> &'static str {
        match self {
            ShellType::Python => "python3",
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Sh => "sh",
            ShellType::Ruby => "ruby",
            ShellType::Fish => "fish",
        }
    }

    /// Flag taking inline code.
    fn inline_flag(&self) -> &'static str {
        match self {
            ShellType::Ruby => "-e",
            _ => "-c",
        }
    }
}

/// `{type: shell, shell: .., file: .. | run: ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(rename = "type")]
    pub kind: ScriptType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl ScriptConfig {
    /// Inline script run by `shell`.
    pub fn inline(shell: ShellType, run: impl Into<String>) -> Self {
        ScriptConfig {
            kind: ScriptType::Shell,
            shell: Some(shell),
            file: None,
            run: Some(run.into()),
        }
    }

    /// Check that exactly one of `file` and `run` is set.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.file, &self.run) {
            (Some(_), Some(_)) => Err("script sets both `file` and `run`".to_string()),
            (None, None) => Err("script sets neither `file` nor `run`".to_string()),
            _ => Ok(()),
        }
    }

    /// Build the command; `file` paths are relative to `base_dir`.
    pub fn command(&self, base_dir: &Path) -> Result<ProcessBuilder> {
        let shell = self.shell.unwrap_or_default();
        let pb = ProcessBuilder::new(shell.program());
        match (&self.file, &self.run) {
            (Some(file), None) => Ok(pb.arg(base_dir.join(file))),
            (None, Some(run)) => Ok(pb.arg(shell.inline_flag()).arg(run)),
            _ => bail!("invalid script: {}", self.validate().err().unwrap_or_default()),
        }
    }
}

/// Run scripts in order with an explicit cwd and environment.
///
/// Returns each script's stdout.
pub fn run_scripts(
    scripts: &[ScriptConfig],
    base_dir: &Path,
    cwd: &Path,
    env: &[(&str, String)],
) -> Result<Vec<String>> {
    let mut outputs = Vec::with_capacity(scripts.len());
    for script in scripts {
        let cmd = script
            .command(base_dir)?
            .cwd(cwd)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())));
        outputs.push(cmd.exec_stdout()?);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate() {
        let mut s = ScriptConfig::inline(ShellType::Sh, "true");
        assert!(s.validate().is_ok());
        s.file = Some("hook.sh".into());
        assert!(s.validate().is_err());
        s.run = None;
        s.file = None;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_command_shape() {
        let base = Path::new("/backends");
        let inline = ScriptConfig::inline(ShellType::Ruby, "puts 1").command(base).unwrap();
        assert_eq!(inline.display_command(), "ruby -e \"puts 1\"");

        let file = ScriptConfig {
            kind: ScriptType::Shell,
            shell: None,
            file: Some("hooks/install.sh".into()),
            run: None,
        };
        assert_eq!(
            file.command(base).unwrap().display_command(),
            "sh /backends/hooks/install.sh"
        );
    }

    #[test]
    fn test_decode_yaml() {
        let s: ScriptConfig =
            serde_yaml::from_str("type: shell\nshell: bash\nrun: echo hi\n").unwrap();
        assert_eq!(s.shell, Some(ShellType::Bash));
        assert!(serde_yaml::from_str::<ScriptConfig>("type: shell\nshell: perl\nrun: x\n").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_scripts_env_and_cwd() {
        let tmp = TempDir::new().unwrap();
        let scripts = vec![ScriptConfig::inline(
            ShellType::Sh,
            "touch marker; printf %s \"$PSPROJECT_PLATFORM\"",
        )];
        let out = run_scripts(
            &scripts,
            tmp.path(),
            tmp.path(),
            &[("PSPROJECT_PLATFORM", "iOS".to_string())],
        )
        .unwrap();
        assert_eq!(out, vec!["iOS"]);
        assert!(tmp.path().join("marker").exists());
    }
}

use crate::error::{Result, TapReleaseError};
use regex::Regex;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Runs the project's build before anything is tagged.
pub trait BuildRunner {
    /// Run `command_template` with `{{.Name}}` replaced by `project_name`.
    fn run(&self, command_template: &str, project_name: &str) -> Result<()>;
}

fn name_placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*\.Name\s*\}\}").expect("placeholder pattern is valid"))
}

/// Expand the `{{.Name}}` placeholder in a build command.
pub fn render_command(command_template: &str, project_name: &str) -> String {
    name_placeholder()
        .replace_all(command_template, regex::NoExpand(project_name))
        .into_owned()
}

/// Executes build commands through `sh -c`, streaming output to the terminal.
pub struct ShellBuildRunner {
    working_dir: PathBuf,
}

impl ShellBuildRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        ShellBuildRunner {
            working_dir: working_dir.into(),
        }
    }
}

impl BuildRunner for ShellBuildRunner {
    fn run(&self, command_template: &str, project_name: &str) -> Result<()> {
        let command = render_command(command_template, project_name);
        if command.trim().is_empty() {
            return Err(TapReleaseError::config("build.command not specified in config"));
        }

        debug!(command = %command, dir = %self.working_dir.display(), "running build");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.working_dir)
            .status()
            .map_err(|e| TapReleaseError::build(format!("failed to start '{}': {}", command, e)))?;

        if !status.success() {
            return Err(TapReleaseError::build(format!(
                "'{}' exited with code {}",
                command,
                status.code().unwrap_or(-1)
            )));
        }

        info!(command = %command, "build succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_command_replaces_name() {
        assert_eq!(
            render_command("go build -o build/{{.Name}} .", "brewer"),
            "go build -o build/brewer ."
        );
        assert_eq!(render_command("make {{ .Name }}", "x"), "make x");
        assert_eq!(render_command("cargo build --release", "x"), "cargo build --release");
    }

    #[test]
    fn test_render_command_does_not_expand_dollars() {
        assert_eq!(render_command("echo {{.Name}}", "$1app"), "echo $1app");
    }

    #[test]
    fn test_successful_build_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        let runner = ShellBuildRunner::new(dir.path());
        runner.run("touch {{.Name}}.built", "demo").unwrap();
        assert!(dir.path().join("demo.built").exists());
    }

    #[test]
    fn test_failing_build_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let runner = ShellBuildRunner::new(dir.path());
        let err = runner.run("exit 3", "demo").unwrap_err();
        assert!(matches!(err, TapReleaseError::Build(_)));
        assert!(err.to_string().contains("code 3"));
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let runner = ShellBuildRunner::new(".");
        assert!(matches!(
            runner.run("  ", "demo"),
            Err(TapReleaseError::Config(_))
        ));
    }
}

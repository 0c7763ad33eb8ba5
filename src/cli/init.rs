//! Starter configuration for `tap-release init`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{
    split_language, BuildConfig, Config, ConfigFormat, FormulaConfig, GitHubConfig,
};
use crate::error::{Result, TapReleaseError};

/// Languages with a starter template. Each may carry `@version`.
pub const LANGUAGES: [&str; 6] = ["go", "rust", "python", "node", "php", "binary"];

/// Arguments for `init`
#[derive(Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Output format; inferred from `output` when absent, else YAML
    pub format: Option<ConfigFormat>,
    pub output: Option<PathBuf>,
    pub language: String,
}

/// Build command, install script and test script for a language.
struct Template {
    build: &'static str,
    install: String,
    test: String,
}

fn template(project_name: &str, base_language: &str) -> Template {
    let test = format!(
        r##"assert_match "{0}", shell_output("#{{bin}}/{0} --version")"##,
        project_name
    );

    let (build, install) = match base_language {
        "rust" => (
            "cargo build --release",
            r#"system "cargo", "install", *std_cargo_args"#.to_string(),
        ),
        "python" => ("python -m build", "virtualenv_install_with_resources".to_string()),
        "node" => (
            "npm run build",
            "system \"npm\", \"install\", *Language::Node.std_npm_install_args(libexec)\n\
             bin.install_symlink Dir[\"#{libexec}/bin/*\"]"
                .to_string(),
        ),
        "php" => (
            "composer install --no-dev --optimize-autoloader",
            format!(
                "libexec.install Dir[\"*\"]\nbin.install_symlink libexec/\"{}\"",
                project_name
            ),
        ),
        "binary" => (
            "# Build handled by an external build system",
            format!("bin.install \"{}\"", project_name),
        ),
        _ => (
            "go build -o build/{{.Name}} .",
            format!("system \"go\", \"build\", \".\"\nbin.install \"{}\"", project_name),
        ),
    };

    Template {
        build,
        install,
        test,
    }
}

/// Reject languages without a template.
pub fn validate_language(language: &str) -> Result<()> {
    let (base, _) = split_language(language);
    if LANGUAGES.contains(&base) {
        Ok(())
    } else {
        Err(TapReleaseError::config(format!(
            "unsupported language: {} (use {}; versions like php@8.4 are allowed)",
            language,
            LANGUAGES.join(", ")
        )))
    }
}

/// Project name from the directory name, `myapp` if there is none.
pub fn detect_project_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("myapp")
        .to_string()
}

/// A config with placeholder GitHub values and the language's scripts.
pub fn starter_config(project_name: &str, language: &str) -> Result<Config> {
    validate_language(language)?;
    let template = template(project_name, split_language(language).0);

    Ok(Config {
        name: project_name.to_string(),
        language: language.to_string(),
        description: "Description of your project".to_string(),
        homepage: format!("https://github.com/USERNAME/{}", project_name),
        license: "MIT".to_string(),
        github: GitHubConfig {
            user: "USERNAME".to_string(),
            repo: project_name.to_string(),
            tap_repo: "homebrew-tap".to_string(),
            remote: "origin".to_string(),
            archive_delay_secs: 5,
        },
        build: BuildConfig {
            command: template.build.to_string(),
        },
        formula: FormulaConfig {
            install: template.install,
            test: template.test,
            caveats: format!(
                "{0} has been installed!\n\nRun '{0} --help' to get started.",
                project_name
            ),
        },
    })
}

fn resolve_format(args: &InitArgs) -> Result<ConfigFormat> {
    match (args.format, &args.output) {
        (Some(format), _) => Ok(format),
        (None, Some(output)) => ConfigFormat::from_path(output),
        (None, None) => Ok(ConfigFormat::Yaml),
    }
}

/// Write a starter config into `project_dir` and return its path.
///
/// Never overwrites an existing file.
pub fn run_init(args: &InitArgs, project_dir: &Path) -> Result<PathBuf> {
    let format = resolve_format(args)?;
    let path = match &args.output {
        Some(output) => project_dir.join(output),
        None => project_dir.join(format!("tap-release.{}", format.extension())),
    };

    let config = starter_config(&detect_project_name(project_dir), &args.language)?;
    let contents = format.render(&config)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => TapReleaseError::config(format!(
                "file already exists: {} (remove it first or use --output)",
                path.display()
            )),
            _ => TapReleaseError::Io(e),
        })?;
    file.write_all(contents.as_bytes())?;

    debug!(path = %path.display(), ?format, "wrote starter config");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(language: &str) -> InitArgs {
        InitArgs {
            format: None,
            output: None,
            language: language.to_string(),
        }
    }

    #[test]
    fn test_validate_language() {
        assert!(validate_language("go").is_ok());
        assert!(validate_language("php@8.4").is_ok());
        assert!(validate_language("cobol").is_err());
        assert!(validate_language("@8").is_err());
    }

    #[test]
    fn test_starter_config_templates() {
        let go = starter_config("brewer", "go").unwrap();
        assert_eq!(go.build.command, "go build -o build/{{.Name}} .");
        assert!(go.formula.install.ends_with("bin.install \"brewer\""));
        assert_eq!(
            go.formula.test,
            "assert_match \"brewer\", shell_output(\"#{bin}/brewer --version\")"
        );
        assert!(go.validate().is_ok());

        let php = starter_config("brewer", "php@8.4").unwrap();
        assert_eq!(php.language, "php@8.4");
        assert!(php.formula.install.contains("libexec/\"brewer\""));
    }

    #[test]
    fn test_detect_project_name() {
        assert_eq!(detect_project_name(Path::new("/work/my-tool")), "my-tool");
        assert_eq!(detect_project_name(Path::new("/")), "myapp");
    }

    #[test]
    fn test_run_init_writes_yaml_by_default() {
        let dir = TempDir::new().unwrap();
        let path = run_init(&args("rust"), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("tap-release.yaml"));

        let config = ConfigFormat::Yaml
            .parse(&std::fs::read_to_string(&path).unwrap())
            .unwrap();
        assert_eq!(config.language, "rust");
        assert_eq!(config.github.tap_repo, "homebrew-tap");
    }

    #[test]
    fn test_run_init_infers_format_from_output() {
        let dir = TempDir::new().unwrap();
        let mut init = args("node");
        init.output = Some(PathBuf::from("release.toml"));
        let path = run_init(&init, dir.path()).unwrap();

        let config = ConfigFormat::Toml
            .parse(&std::fs::read_to_string(path).unwrap())
            .unwrap();
        assert_eq!(config.build.command, "npm run build");
    }

    #[test]
    fn test_run_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tap-release.json"), "{}").unwrap();

        let mut init = args("go");
        init.format = Some(ConfigFormat::Json);
        let err = run_init(&init, dir.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("tap-release.json")).unwrap(),
            "{}"
        );
    }
}

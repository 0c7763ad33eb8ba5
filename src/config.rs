use crate::error::{Result, TapReleaseError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched in the working directory when no path is given.
pub const CONFIG_CANDIDATES: [&str; 4] = [
    "tap-release.yaml",
    "tap-release.yml",
    "tap-release.json",
    "tap-release.toml",
];

/// Project release configuration.
///
/// Describes the project, where its sources and tap live on GitHub, how to
/// build it, and the scripts that go into the generated formula.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub name: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub homepage: String,

    #[serde(default)]
    pub license: String,

    pub github: GitHubConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub formula: FormulaConfig,
}

fn default_language() -> String {
    "go".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Seconds to wait after pushing a tag before downloading its archive.
fn default_archive_delay_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubConfig {
    pub user: String,

    pub repo: String,

    pub tap_repo: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_archive_delay_secs")]
    pub archive_delay_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BuildConfig {
    #[serde(default)]
    pub command: String,
}

/// Ruby snippets placed into the formula body.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct FormulaConfig {
    #[serde(default)]
    pub install: String,

    #[serde(default)]
    pub test: String,

    #[serde(default)]
    pub caveats: String,
}

/// On-disk formats a config file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(TapReleaseError::config(format!(
                "unsupported config format: {} (use .yaml, .json or .toml)",
                path.display()
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
        }
    }

    pub fn parse(self, contents: &str) -> Result<Config> {
        let parsed = match self {
            ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| TapReleaseError::config(format!("failed to parse config file: {}", e)))
    }

    pub fn render(self, config: &Config) -> Result<String> {
        let rendered = match self {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| TapReleaseError::config(format!("failed to serialize config: {}", e)))
    }
}

impl Config {
    /// Reject configs missing the fields every release needs.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("github.user", &self.github.user),
            ("github.repo", &self.github.repo),
            ("github.tap_repo", &self.github.tap_repo),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TapReleaseError::config(format!("{} is required", field)));
            }
        }

        Ok(())
    }

    /// Language name without any `@version` suffix (`php@8.4` -> `php`).
    pub fn base_language(&self) -> &str {
        split_language(&self.language).0
    }

    /// Source archive GitHub serves for a tag
    pub fn tarball_url(&self, version: &str) -> String {
        format!(
            "https://github.com/{}/{}/archive/refs/tags/{}.tar.gz",
            self.github.user, self.github.repo, version
        )
    }

    pub fn tap_repo_url(&self) -> String {
        format!(
            "https://github.com/{}/{}.git",
            self.github.user, self.github.tap_repo
        )
    }

    pub fn head_url(&self) -> String {
        format!(
            "https://github.com/{}/{}.git",
            self.github.user, self.github.repo
        )
    }

    /// Ruby class name for the formula (`my-app` -> `MyApp`)
    pub fn formula_class_name(&self) -> String {
        to_camel_case(&self.name)
    }

    pub fn formula_file_name(&self) -> String {
        format!("{}.rb", self.name)
    }

    /// How users install the published formula
    pub fn install_hint(&self) -> String {
        format!("brew install {}/tap/{}", self.github.user, self.name)
    }
}

/// Split `lang@version` into its parts.
pub fn split_language(language: &str) -> (&str, Option<&str>) {
    match language.split_once('@') {
        Some((base, version)) if !base.is_empty() => (base, Some(version)),
        _ => (language, None),
    }
}

fn to_camel_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c == '.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Loads and validates the project configuration.
///
/// Looks in the following order:
/// 1. Custom path provided as parameter
/// 2. `tap-release.{yaml,yml,json,toml}` in the current directory
///
/// # Returns
/// * `Ok((Config, PathBuf))` - Loaded configuration and the file it came from
/// * `Err` - If no file is found, or it cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>) -> Result<(Config, PathBuf)> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                TapReleaseError::config(
                    "no tap-release.yaml found (run `tap-release init` to create one)",
                )
            })?,
    };

    let contents = fs::read_to_string(&path).map_err(|e| {
        TapReleaseError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let config = ConfigFormat::from_path(&path)?.parse(&contents)?;
    config.validate()?;

    Ok((config, path))
}

//! Homebrew formula generation.

use crate::config::{split_language, Config};

/// Everything that goes into one rendered formula.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaData {
    /// Formula class name (e.g., "MyApp")
    pub class_name: String,
    pub desc: String,
    pub homepage: String,
    /// Source archive URL
    pub url: String,
    /// SHA256 checksum of the archive
    pub sha256: String,
    pub license: String,
    pub head_url: String,
    /// Project language, possibly with `@version`
    pub language: String,
    pub install: String,
    pub test: String,
    pub caveats: String,
}

impl FormulaData {
    pub fn from_config(config: &Config, version: &str, sha256: &str) -> Self {
        FormulaData {
            class_name: config.formula_class_name(),
            desc: config.description.clone(),
            homepage: config.homepage.clone(),
            url: config.tarball_url(version),
            sha256: sha256.to_string(),
            license: config.license.clone(),
            head_url: config.head_url(),
            language: config.language.clone(),
            install: config.formula.install.clone(),
            test: config.formula.test.clone(),
            caveats: config.formula.caveats.clone(),
        }
    }
}

/// Homebrew formula generator.
pub struct FormulaGenerator;

impl FormulaGenerator {
    #[must_use]
    pub fn generate(data: &FormulaData) -> String {
        let mut formula = format!(
            r#"class {} < Formula
  desc "{}"
  homepage "{}"
  url "{}"
  sha256 "{}"
  license "{}"
  head "{}", branch: "main"
"#,
            data.class_name,
            escape(&data.desc),
            data.homepage,
            data.url,
            data.sha256,
            escape(&data.license),
            data.head_url
        );

        if let Some(dependency) = language_dependency(&data.language) {
            formula.push('\n');
            formula.push_str(&format!("  {}\n", dependency));
        }

        formula.push_str("\n  def install\n");
        formula.push_str(&indent(&data.install, 4));
        formula.push_str("\n  end\n");

        if !data.test.trim().is_empty() {
            formula.push_str("\n  test do\n");
            formula.push_str(&indent(&data.test, 4));
            formula.push_str("\n  end\n");
        }

        if !data.caveats.trim().is_empty() {
            formula.push_str("\n  def caveats\n    <<~EOS\n");
            formula.push_str(&indent(&data.caveats, 6));
            formula.push_str("\n    EOS\n  end\n");
        }

        formula.push_str("end\n");
        formula
    }
}

/// `depends_on` line for the project's toolchain, if it needs one.
fn language_dependency(language: &str) -> Option<String> {
    let (base, version) = split_language(language);
    let formula_name = |name: &str| match version {
        Some(version) => format!("{}@{}", name, version),
        None => name.to_string(),
    };

    match base {
        "go" => Some(r#"depends_on "go" => :build"#.to_string()),
        "rust" => Some(r#"depends_on "rust" => :build"#.to_string()),
        "node" => Some(format!(r#"depends_on "{}""#, formula_name("node"))),
        "python" => Some(format!(r#"depends_on "{}""#, formula_name("python"))),
        "php" => Some(format!(r#"depends_on "{}""#, formula_name("php"))),
        _ => None,
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Indent every non-blank line; blank lines stay empty.
fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.trim_end()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

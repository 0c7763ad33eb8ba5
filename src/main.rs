use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tap_release::artifact::HttpArtifactHasher;
use tap_release::build::ShellBuildRunner;
use tap_release::cli::init::{self, InitArgs};
use tap_release::cli::orchestration::{self, BumpFlags, Collaborators, ReleaseArgs};
use tap_release::config::{self, Config, ConfigFormat};
use tap_release::domain::{Fingerprint, LOCK_FILE};
use tap_release::git::Git2Repository;
use tap_release::tap::GitTapPublisher;
use tap_release::{telemetry, ui};

#[derive(Parser)]
#[command(
    name = "tap-release",
    version,
    about = "Build, tag and publish a project to its Homebrew tap"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Show debug logs")]
    verbose: bool,

    #[arg(long, global = true, help = "Write logs as JSON lines")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a starter configuration file
    Init {
        #[arg(short, long, value_enum, help = "Config format [default: yaml]")]
        format: Option<ConfigFormat>,

        #[arg(short, long, help = "Output path (default: tap-release.<format>)")]
        output: Option<PathBuf>,

        #[arg(
            short,
            long,
            default_value = "go",
            help = "Project language: go, rust, python, node, php or binary (e.g. php@8.4)"
        )]
        language: String,
    },

    /// Build, tag, hash and publish the next version
    Release {
        #[arg(long, help = "Bump the major version")]
        major: bool,

        #[arg(long, help = "Bump the minor version")]
        minor: bool,

        #[arg(long, help = "Bump the patch version (default)")]
        patch: bool,

        #[arg(long, help = "Show the release plan without building or publishing")]
        dry_run: bool,
    },

    /// Align the lock file with the latest remote tag
    Sync,
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, telemetry::default_level(cli.verbose));

    if let Err(e) = run(cli) {
        ui::display_failure(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init {
            format,
            output,
            language,
        } => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            let path = init::run_init(
                &InitArgs {
                    format,
                    output,
                    language,
                },
                &cwd,
            )?;

            ui::display_success(&format!("Created {}", path.display()));
            println!("\nNext steps:");
            println!("  1. Edit the config file and replace USERNAME, description, etc.");
            println!("  2. Create a GitHub repository for the tap (default 'homebrew-tap')");
            println!("  3. Create a release: tap-release release");
            Ok(())
        }
        Command::Release {
            major,
            minor,
            patch,
            dry_run,
        } => {
            let args = ReleaseArgs {
                bump: BumpFlags {
                    major,
                    minor,
                    patch,
                },
                dry_run,
            };
            args.bump.resolve()?;

            let (config, config_path) = config::load_config(cli.config.as_deref())?;
            let (repo, workdir) = open_project(&config, &config_path)?;

            let fingerprint = Fingerprint::current(&workdir);
            let builder = ShellBuildRunner::new(&workdir);
            let hasher = HttpArtifactHasher::new()?;
            let publisher = GitTapPublisher::new(
                config.tap_repo_url(),
                GitTapPublisher::default_checkout_dir(&config.github.tap_repo),
            );
            let collaborators = Collaborators {
                vcs: &repo,
                builder: &builder,
                hasher: &hasher,
                publisher: &publisher,
            };

            let result = orchestration::run_release(
                args,
                &config,
                &workdir.join(LOCK_FILE),
                &fingerprint,
                &collaborators,
            )?;

            if !result.dry_run {
                ui::display_success(&format!("Released {} {}", config.name, result.tag));
                ui::display_next_steps(&config, &result.tag, LOCK_FILE);
            }
            Ok(())
        }
        Command::Sync => {
            let (config, config_path) = config::load_config(cli.config.as_deref())?;
            let (repo, workdir) = open_project(&config, &config_path)?;

            orchestration::run_sync(
                &repo,
                &workdir.join(LOCK_FILE),
                &Fingerprint::current(&workdir),
            )?;
            Ok(())
        }
    }
}

/// Git repository containing the config file, and its working tree root.
fn open_project(config: &Config, config_path: &Path) -> Result<(Git2Repository, PathBuf)> {
    let project_dir = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    debug!(config = %config_path.display(), dir = %project_dir.display(), "opening project");

    let repo = Git2Repository::open(project_dir, config.github.remote.clone())
        .with_context(|| format!("no git repository at {}", project_dir.display()))?;
    let workdir = repo.workdir()?;
    Ok((repo, workdir))
}

//! Publishing formulas into a Homebrew tap repository.
//!
//! The tap is shared by every formula its owner publishes, so a publish must
//! never leave it with fewer formulas than it had. [publish_formula] counts
//! before and after writing and refuses to commit when the count drops.

use crate::error::{Result, TapReleaseError};
use crate::git::credentials::remote_callbacks;
use git2::{build::RepoBuilder, ObjectType, Repository, Signature, Tree};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory inside a tap that conventionally holds formulas.
pub const FORMULA_DIR: &str = "Formula";

/// What a publish did to the tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Formula path relative to the tap root
    pub path: PathBuf,
    pub formulas_before: usize,
    pub formulas_after: usize,
    /// False when the tap already held an identical formula
    pub changed: bool,
}

/// Pushes a rendered formula into the tap repository.
pub trait TapPublisher {
    fn publish(&self, formula_file: &str, document: &str, commit_message: &str) -> Result<PublishReport>;
}

/// A checked-out tap that formulas can be written into.
pub trait TapWorkspace {
    /// Number of tracked `*.rb` files at the tap root and in `Formula/`,
    /// as the next commit would record them.
    fn formula_count(&self) -> Result<usize>;

    /// Formula count of the tap as currently published, before any write.
    fn published_formula_count(&self) -> Result<usize> {
        self.formula_count()
    }

    /// Write and stage the formula; returns its path relative to the tap root.
    fn write_formula(&mut self, file_name: &str, document: &str) -> Result<PathBuf>;

    /// Commit what is staged and push. Returns false if nothing changed.
    fn commit_and_push(&mut self, path: &Path, message: &str) -> Result<bool>;
}

/// Fail if writing reduced the number of formulas in the tap.
pub fn ensure_no_formula_loss(before: usize, after: usize) -> Result<()> {
    if after < before {
        return Err(TapReleaseError::PublishSafetyViolation { before, after });
    }
    Ok(())
}

/// Write, verify and push one formula.
pub fn publish_formula<W>(
    workspace: &mut W,
    file_name: &str,
    document: &str,
    commit_message: &str,
) -> Result<PublishReport>
where
    W: TapWorkspace + ?Sized,
{
    let before = workspace.published_formula_count()?;
    let path = workspace.write_formula(file_name, document)?;
    let after = workspace.formula_count()?;

    if let Err(e) = ensure_no_formula_loss(before, after) {
        warn!(before, after, "refusing to publish, tap would lose formulas");
        return Err(e);
    }

    let changed = workspace.commit_and_push(&path, commit_message)?;
    Ok(PublishReport {
        path,
        formulas_before: before,
        formulas_after: after,
        changed,
    })
}

/// Tap clone on local disk.
pub struct GitTapWorkspace {
    repo: Repository,
    root: PathBuf,
}

impl GitTapWorkspace {
    /// Fresh clone of `url` into `dir`, replacing whatever was there.
    pub fn clone(url: &str, dir: &Path) -> Result<Self> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());
        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, dir)
            .map_err(|e| TapReleaseError::tap(format!("failed to clone {}: {}", url, e)))?;

        debug!(url, dir = %dir.display(), "cloned tap");
        Ok(GitTapWorkspace {
            repo,
            root: dir.to_path_buf(),
        })
    }

    fn branch_name(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) => head
                .shorthand()
                .map(str::to_string)
                .ok_or_else(|| TapReleaseError::tap("tap HEAD is not a branch")),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                self.repo.set_head("refs/heads/main")?;
                Ok("main".to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tree the next commit would record.
    fn staged_tree(&self) -> Result<Tree<'_>> {
        let tree_id = self.repo.index()?.write_tree()?;
        Ok(self.repo.find_tree(tree_id)?)
    }

    fn push(&self, branch: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .map_err(|e| TapReleaseError::tap(format!("tap has no origin: {}", e)))?;

        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "tap rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });
        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| TapReleaseError::tap(format!("failed to push tap: {}", e)))
    }
}

fn is_formula(name: Option<&str>) -> bool {
    name.is_some_and(|name| name.ends_with(".rb"))
}

/// Formula blobs at the top of `tree` and in its `Formula/` subtree.
fn count_formulas(repo: &Repository, tree: &Tree<'_>) -> Result<usize> {
    let top = tree
        .iter()
        .filter(|entry| entry.kind() == Some(ObjectType::Blob) && is_formula(entry.name()))
        .count();

    let nested = match tree.get_name(FORMULA_DIR) {
        Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
            let subtree = repo.find_tree(entry.id())?;
            subtree
                .iter()
                .filter(|entry| entry.kind() == Some(ObjectType::Blob) && is_formula(entry.name()))
                .count()
        }
        _ => 0,
    };

    Ok(top + nested)
}

impl TapWorkspace for GitTapWorkspace {
    fn formula_count(&self) -> Result<usize> {
        count_formulas(&self.repo, &self.staged_tree()?)
    }

    fn published_formula_count(&self) -> Result<usize> {
        match self.repo.head() {
            Ok(head) => count_formulas(&self.repo, &head.peel_to_tree()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_formula(&mut self, file_name: &str, document: &str) -> Result<PathBuf> {
        let relative = if self.root.join(FORMULA_DIR).is_dir() {
            Path::new(FORMULA_DIR).join(file_name)
        } else {
            PathBuf::from(file_name)
        };

        fs::write(self.root.join(&relative), document)?;
        let mut index = self.repo.index()?;
        index.add_path(&relative)?;
        index.write()?;
        Ok(relative)
    }

    fn commit_and_push(&mut self, path: &Path, message: &str) -> Result<bool> {
        let branch = self.branch_name()?;
        let tree_id = self.staged_tree()?.id();

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            info!(path = %path.display(), "tap already has this formula, nothing to push");
            return Ok(false);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = match self.repo.signature() {
            Ok(signature) => signature,
            Err(_) => Signature::now("tap-release", "tap-release@localhost")?,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let commit = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!(%commit, branch = %branch, "committed formula");

        self.push(&branch)?;
        info!(branch = %branch, "pushed tap");
        Ok(true)
    }
}

/// [TapPublisher] that clones the tap with git, commits and pushes.
pub struct GitTapPublisher {
    url: String,
    checkout_dir: PathBuf,
}

impl GitTapPublisher {
    pub fn new(url: impl Into<String>, checkout_dir: impl Into<PathBuf>) -> Self {
        GitTapPublisher {
            url: url.into(),
            checkout_dir: checkout_dir.into(),
        }
    }

    /// Default checkout location for a tap, under the user cache directory.
    pub fn default_checkout_dir(tap_repo: &str) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tap-release")
            .join("taps")
            .join(tap_repo)
    }
}

impl TapPublisher for GitTapPublisher {
    fn publish(&self, formula_file: &str, document: &str, commit_message: &str) -> Result<PublishReport> {
        let mut workspace = GitTapWorkspace::clone(&self.url, &self.checkout_dir)?;
        publish_formula(&mut workspace, formula_file, document, commit_message)
    }
}

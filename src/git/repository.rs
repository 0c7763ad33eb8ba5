use crate::domain::version::{latest_version_tag, INITIAL_VERSION};
use crate::error::{Result, TapReleaseError};
use crate::git::credentials::remote_callbacks;
use crate::git::VersionControl;
use git2::{AutotagOption, Repository as Git2Repo, Signature, Status, StatusOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Wrapper around git2::Repository with our trait interface
///
/// `git2::Repository` is `Send` but not `Sync`, hence the mutex.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
    remote: String,
}

impl Git2Repository {
    /// Open or discover a git repository, talking to `remote` for tags
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository {
            repo: Mutex::new(repo),
            remote: remote.into(),
        })
    }

    /// Root of the working tree
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo()
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| TapReleaseError::config("bare repositories cannot be released"))
    }

    fn repo(&self) -> MutexGuard<'_, Git2Repo> {
        self.repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find_remote<'r>(&self, repo: &'r Git2Repo) -> Result<git2::Remote<'r>> {
        repo.find_remote(&self.remote).map_err(|e| {
            TapReleaseError::remote(format!("cannot find remote '{}': {}", self.remote, e))
        })
    }

    /// Where the remote's tags are mirrored, away from local `refs/tags`.
    fn mirror_prefix(&self) -> String {
        format!("refs/remotes/{}/tags/", self.remote)
    }

    /// Tag names the remote currently advertises.
    ///
    /// The mirror is cleared before every fetch, so tags deleted upstream or
    /// created only locally never show up here.
    fn remote_tags(&self, repo: &Git2Repo) -> Result<Vec<String>> {
        let mut remote = self.find_remote(repo)?;
        let prefix = self.mirror_prefix();

        let stale: Vec<String> = repo
            .references_glob(&format!("{}*", prefix))?
            .names()
            .filter_map(|name| name.ok().map(str::to_string))
            .collect();
        for name in stale {
            repo.find_reference(&name)?.delete()?;
        }

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options
            .remote_callbacks(remote_callbacks())
            .download_tags(AutotagOption::None);
        let refspec = format!("+refs/tags/*:{}*", prefix);
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| {
                TapReleaseError::remote(format!(
                    "failed to fetch tags from '{}': {}",
                    self.remote, e
                ))
            })?;

        let mut tags = Vec::new();
        for reference in repo.references_glob(&format!("{}*", prefix))? {
            if let Some(name) = reference?.name().and_then(|n| n.strip_prefix(&prefix)) {
                tags.push(name.to_string());
            }
        }

        debug!(remote = %self.remote, count = tags.len(), "fetched remote tags");
        Ok(tags)
    }

    fn push_tag(&self, repo: &Git2Repo, tag: &str) -> Result<()> {
        let mut remote = self.find_remote(repo)?;

        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| {
                if e.class() == git2::ErrorClass::Net {
                    TapReleaseError::remote(format!("network error during push: {}", e))
                } else {
                    TapReleaseError::remote(format!("failed to push tag '{}': {}", tag, e))
                }
            })
    }
}

impl VersionControl for Git2Repository {
    fn latest_tag(&self) -> Result<String> {
        let repo = self.repo();
        let tags = self.remote_tags(&repo)?;
        let latest = latest_version_tag(tags.iter().map(String::as_str)).unwrap_or(INITIAL_VERSION);
        Ok(latest.to_string())
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        let repo = self.repo();
        Ok(self.remote_tags(&repo)?.iter().any(|name| name == tag))
    }

    fn create_tag(&self, tag: &str) -> Result<()> {
        let repo = self.repo();
        let head = repo.head()?.peel_to_commit()?;
        let signature = match repo.signature() {
            Ok(signature) => signature,
            Err(_) => Signature::now("tap-release", "tap-release@localhost")?,
        };

        repo.tag(
            tag,
            head.as_object(),
            &signature,
            &format!("Release {}", tag),
            false,
        )
        .map_err(|e| {
            if e.code() == git2::ErrorCode::Exists {
                TapReleaseError::TagConflict(tag.to_string())
            } else {
                TapReleaseError::Git(e)
            }
        })?;
        debug!(tag, commit = %head.id(), "created annotated tag");

        if let Err(e) = self.push_tag(&repo, tag) {
            if let Err(cleanup) = repo.tag_delete(tag) {
                warn!(tag, error = %cleanup, "failed to remove unpushed local tag");
            }
            return Err(e);
        }
        info!(tag, remote = %self.remote, "pushed release tag");
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let repo = self.repo();
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(false);

        let statuses = repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != Status::CURRENT && !entry.status().contains(Status::IGNORED)))
    }
}

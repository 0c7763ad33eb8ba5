use git2::{Cred, CredentialType, RemoteCallbacks};
use std::path::PathBuf;

/// Callbacks that authenticate against a remote.
///
/// Tries the SSH agent, then the usual key files under `~/.ssh`, then the
/// configured credential helper, and finally libgit2's default credentials.
pub fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u32;

    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > 8 {
            return Err(git2::Error::from_str("authentication failed"));
        }

        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }

            for key_path in ssh_key_paths() {
                if key_path.exists() {
                    if let Ok(cred) = Cred::ssh_key(username, None, &key_path, None) {
                        return Ok(cred);
                    }
                }
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }

        Cred::default()
    });

    callbacks
}

fn ssh_key_paths() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };

    ["id_ed25519", "id_rsa", "id_ecdsa"]
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .collect()
}

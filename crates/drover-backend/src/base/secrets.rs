//! Secrets and repository credentials over the store.
//!
//! Secret values live as object bodies under `secrets/{repo}/{name}`;
//! repository credentials as one JSON object. Neither is a head: bodies
//! carry the data, keys only the name.

use bytes::Bytes;

use drover_commons::{RepoAddress, RepoCredentials, Secret};
use drover_store::{keys, Storage};

use crate::error::{BackendError, Result};

pub async fn list_secret_names(storage: &Storage, repo: &RepoAddress) -> Result<Vec<String>> {
    let prefix = keys::secrets_prefix(repo);
    Ok(storage
        .list_keys(&prefix)
        .await?
        .into_iter()
        .filter_map(|key| key.strip_prefix(&prefix).map(|name| name.to_string()))
        .collect())
}

pub async fn get_secret(
    storage: &Storage,
    repo: &RepoAddress,
    secret_name: &str,
) -> Result<Option<Secret>> {
    match storage
        .get_object_opt(&keys::secret_key(repo, secret_name))
        .await?
    {
        Some(bytes) => Ok(Some(Secret {
            secret_name: secret_name.to_string(),
            secret_value: String::from_utf8_lossy(&bytes).into_owned(),
        })),
        None => Ok(None),
    }
}

pub async fn add_secret(storage: &Storage, repo: &RepoAddress, secret: &Secret) -> Result<()> {
    let key = keys::secret_key(repo, &secret.secret_name);
    if storage.exists(&key).await? {
        return Err(BackendError::AlreadyExists(format!(
            "secret '{}' in the '{repo}' repo",
            secret.secret_name
        )));
    }
    storage
        .put_object(&key, Bytes::from(secret.secret_value.clone().into_bytes()))
        .await?;
    Ok(())
}

pub async fn update_secret(storage: &Storage, repo: &RepoAddress, secret: &Secret) -> Result<()> {
    let key = keys::secret_key(repo, &secret.secret_name);
    if !storage.exists(&key).await? {
        return Err(BackendError::NotFound(format!(
            "secret '{}' in the '{repo}' repo",
            secret.secret_name
        )));
    }
    storage
        .put_object(&key, Bytes::from(secret.secret_value.clone().into_bytes()))
        .await?;
    Ok(())
}

pub async fn delete_secret(
    storage: &Storage,
    repo: &RepoAddress,
    secret_name: &str,
) -> Result<()> {
    storage
        .delete_object(&keys::secret_key(repo, secret_name))
        .await?;
    Ok(())
}

pub async fn get_repo_credentials(
    storage: &Storage,
    repo: &RepoAddress,
) -> Result<Option<RepoCredentials>> {
    match storage
        .get_object_opt(&keys::repo_credentials_key(repo))
        .await?
    {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub async fn save_repo_credentials(
    storage: &Storage,
    repo: &RepoAddress,
    credentials: &RepoCredentials,
) -> Result<()> {
    let body = serde_json::to_vec(credentials)?;
    storage
        .put_object(&keys::repo_credentials_key(repo), Bytes::from(body))
        .await?;
    Ok(())
}

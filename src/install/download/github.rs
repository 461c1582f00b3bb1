//! GitHub "latest release" resolution
//!
//! GitHub answers `/{owner}/{repo}/releases/latest` with a redirect to
//! `/{owner}/{repo}/releases/tag/{tag}`. Following it and reading the final
//! URL avoids the rate-limited REST API.

use log::{debug, info};
use url::Url;

use crate::install::catalog::ArchiveKind;
use crate::install::error::{InstallError, Result};

/// Fetch the tag the "latest release" endpoint of `repo_url` redirects to
pub async fn resolve_latest_tag(client: &reqwest::Client, repo_url: &str) -> Result<String> {
    let repo_url = repo_url.trim_end_matches('/');
    let latest_url = format!("{repo_url}/releases/latest");

    let response = client
        .get(&latest_url)
        .send()
        .await
        .map_err(|e| InstallError::network(&latest_url, e))?;

    if !response.status().is_success() {
        return Err(InstallError::HttpStatus {
            url: latest_url,
            status: response.status().as_u16(),
        });
    }

    let final_url = response.url().clone();
    debug!("{latest_url} resolved to {final_url}");

    tag_from_url(repo_url, &final_url).ok_or_else(|| InstallError::ReleaseTag {
        url: final_url.to_string(),
    })
}

/// Extract `{tag}` from `.../releases/tag/{tag}`, comparing paths only
pub fn tag_from_url(repo_url: &str, final_url: &Url) -> Option<String> {
    let repo_path = Url::parse(repo_url)
        .ok()
        .map(|u| u.path().trim_end_matches('/').to_string())?;
    let prefix = format!("{repo_path}/releases/tag/");

    let tag = final_url.path().strip_prefix(&prefix)?.trim_matches('/');
    if tag.is_empty() || tag.contains('/') {
        return None;
    }
    Some(tag.to_string())
}

/// `{repo_url}/releases/download/{tag}/{file_stem}{ext}`
pub fn compose_download_url(repo_url: &str, tag: &str, file_stem: &str) -> String {
    format!(
        "{}/releases/download/{}/{}{}",
        repo_url.trim_end_matches('/'),
        tag,
        file_stem,
        ArchiveKind::for_file_stem(file_stem).extension()
    )
}

/// Resolve the concrete download URL of `file_stem` in the latest release
///
/// Any failure is wrapped as [`InstallError::ReleaseLookup`], which is fatal.
pub async fn locate_latest(
    client: &reqwest::Client,
    repo_url: &str,
    file_stem: &str,
) -> Result<String> {
    let tag = resolve_latest_tag(client, repo_url)
        .await
        .map_err(|e| InstallError::release_lookup(repo_url, e))?;
    let url = compose_download_url(repo_url, &tag, file_stem);
    info!("Latest release of {repo_url} is {tag}");
    Ok(url)
}

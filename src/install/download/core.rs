//! Streaming download of a single remote file

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::install::error::{InstallError, Result};

// Emit progress every 256KB
const PROGRESS_CHUNK: u64 = 256 * 1024;

/// Build the HTTP client shared by every request of a run
pub fn build_client(user_agent: &str, connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| InstallError::network("<client>", e))
}

/// Hidden sibling the body is streamed into before the final rename
fn partial_path(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    destination.with_file_name(format!(".{file_name}.part"))
}

/// Download `url` to `destination`
///
/// Bytes are streamed to `.{name}.part` next to the destination and renamed
/// into place once the body is complete, so `destination` is either absent or
/// whole. The partial file is removed on failure. `on_progress` receives the
/// running byte count and the advertised length, if any.
///
/// Returns the number of bytes written.
pub async fn fetch<F>(
    client: &reqwest::Client,
    url: &str,
    destination: &Path,
    inactivity_timeout: Duration,
    mut on_progress: F,
) -> Result<u64>
where
    F: FnMut(u64, Option<u64>),
{
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallError::network(url, e))?;

    if !response.status().is_success() {
        return Err(InstallError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total_bytes = response.content_length();
    let part = partial_path(destination);

    let result = stream_to_file(
        response,
        url,
        &part,
        inactivity_timeout,
        total_bytes,
        &mut on_progress,
    )
    .await;

    match result {
        Ok(downloaded) => {
            tokio::fs::rename(&part, destination).await.map_err(|e| {
                InstallError::io(
                    format!("Failed to move download into {}", destination.display()),
                    e,
                )
            })?;
            debug!("Fetched {url} ({downloaded} bytes) to {}", destination.display());
            Ok(downloaded)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&part).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove partial download {}: {cleanup}", part.display());
            }
            Err(e)
        }
    }
}

async fn stream_to_file<F>(
    response: reqwest::Response,
    url: &str,
    part: &Path,
    inactivity_timeout: Duration,
    total_bytes: Option<u64>,
    on_progress: &mut F,
) -> Result<u64>
where
    F: FnMut(u64, Option<u64>),
{
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| InstallError::io(format!("Failed to create {}", part.display()), e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_progress_bytes = 0u64;
    on_progress(0, total_bytes);

    loop {
        let chunk = match timeout(inactivity_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(InstallError::network(url, e)),
            Ok(None) => break,
            Err(_) => {
                return Err(InstallError::Stalled {
                    url: url.to_string(),
                    secs: inactivity_timeout.as_secs(),
                });
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| InstallError::io(format!("Failed to write {}", part.display()), e))?;
        downloaded += chunk.len() as u64;

        if downloaded - last_progress_bytes >= PROGRESS_CHUNK {
            on_progress(downloaded, total_bytes);
            last_progress_bytes = downloaded;
        }
    }

    file.flush()
        .await
        .map_err(|e| InstallError::io(format!("Failed to flush {}", part.display()), e))?;
    file.sync_all()
        .await
        .map_err(|e| InstallError::io(format!("Failed to sync {}", part.display()), e))?;

    if last_progress_bytes != downloaded {
        on_progress(downloaded, total_bytes);
    }

    Ok(downloaded)
}

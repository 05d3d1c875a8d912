use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::info;

async fn download_file(url: &str, path: &Path) -> Result<()> {
    info!("Downloading {} from {}", path.display(), url);

    let mut header_map = HeaderMap::new();

    if let Ok(token) = env::var("GITHUB_TOKEN") {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Invalid GITHUB_TOKEN format")?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .context("Failed to send request")?;

    if !response.status().is_success() {
        bail!("Failed to download {}: {}", url, response.status());
    }

    let bytes = response.bytes().await.context("Failed to read bytes")?;

    persist(path, &bytes).await?;

    info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Write through a sibling `.part` file and rename, so `path` only ever
/// exists with complete contents.
async fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let partial = partial_path(path);
    if let Err(err) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err).with_context(|| format!("Failed to write {}", partial.display()));
    }
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("Failed to move weights into {}", path.display()))?;
    Ok(())
}

/// Make sure the weights artifact is on disk, fetching it once when a
/// download URL is configured. Without a URL a missing file is left for the
/// model loader to report.
pub async fn ensure_weights_exist(model_path: &Path, model_url: Option<&str>) -> Result<()> {
    info!("Checking weights...");
    if model_path.exists() {
        return Ok(());
    }

    match model_url {
        Some(url) => download_file(url, model_path).await,
        None => Ok(()),
    }
}

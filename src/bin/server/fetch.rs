//! Input fetching shared between CLI and server modes.

use std::path::Path;

/// Downloads bytes from a URL.
pub async fn download_bytes(
    url: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(format!("HTTP error fetching '{url}': {}", response.status()).into());
    }
    Ok(response.bytes().await?.to_vec())
}

/// Reads an input that is either a local path or an http(s) URL.
pub async fn read_input(
    input: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    if input.starts_with("http://") || input.starts_with("https://") {
        download_bytes(input).await
    } else {
        Ok(tokio::fs::read(Path::new(input)).await?)
    }
}

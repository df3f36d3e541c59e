use anyhow::Result;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Chunked HTTP downloader with resume support. Downloads are strictly
/// sequential; when selection yields a video+audio pair the caller invokes
/// this twice, one stream after the other.
pub struct Downloader {
    client: reqwest::Client,
    retries: u32,
}

impl Downloader {
    /// Shares the invocation's session client so download requests carry the
    /// same cookies as the metadata requests.
    pub fn new(client: reqwest::Client, retries: u32) -> Self {
        Self { client, retries }
    }

    pub async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
        // An existing partial file is resumed via a Range request.
        let resume_from = match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => {
                info!("Found partial file, resuming from {} bytes", meta.len());
                Some(meta.len())
            }
            _ => None,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut request = self.client.get(url).header("Accept", "*/*");
            if let Some(pos) = resume_from {
                request = request.header("Range", format!("bytes={}-", pos));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.retries {
                        return Err(e.into());
                    }
                    warn!("Request failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() || status.as_u16() == 206 {
                return self.write_body(response, output_path, resume_from).await;
            } else if status.as_u16() == 403 && attempt < self.retries {
                warn!(
                    "HTTP 403 (attempt {}), retrying in {} seconds",
                    attempt,
                    2_u64.pow(attempt)
                );
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                continue;
            } else {
                anyhow::bail!("Download failed after {} attempts: HTTP {}", attempt, status);
            }
        }
    }

    async fn write_body(
        &self,
        response: reqwest::Response,
        output_path: &Path,
        resume_from: Option<u64>,
    ) -> Result<()> {
        let content_length = response.content_length();
        let mut downloaded = resume_from.unwrap_or(0);

        let mut file = if resume_from.is_some() {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(output_path)
                .await?;
            file.seek(std::io::SeekFrom::End(0)).await?;
            file
        } else {
            File::create(output_path).await?
        };

        // Range responses report the remaining length only.
        let expected_total = match (content_length, resume_from) {
            (Some(len), Some(partial)) => Some(len + partial),
            (Some(len), None) => Some(len),
            _ => None,
        };
        info!(
            "Downloading {} bytes to {}",
            expected_total.map_or("unknown".to_string(), |s| s.to_string()),
            output_path.display()
        );

        let mut stream = response.bytes_stream();
        let mut last_report = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await?;

            if downloaded - last_report >= 8 * 1024 * 1024 {
                last_report = downloaded;
                match expected_total {
                    Some(total) => debug!(
                        "Progress: {}% ({}/{} bytes)",
                        downloaded * 100 / total.max(1),
                        downloaded,
                        total
                    ),
                    None => debug!("Downloaded {} bytes", downloaded),
                }
            }
        }

        file.flush().await?;
        info!("Downloaded to: {}", output_path.display());
        Ok(())
    }
}

/// Temp file path for one stream of a pair: `<output>.<kind>.part`.
pub fn part_path(output_path: &Path, kind: &str) -> PathBuf {
    let mut name = output_path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{kind}.part"));
    output_path.with_file_name(name)
}

use crate::config::Config;
use crate::core::{classify_adaptive, DriveError, RawManifest, StreamDescriptor};
use crate::extractors::fallback;
use crate::utils::filename_from_disposition;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, COOKIE, REFERER, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

const VIDEO_INFO_URL: &str = "https://drive.google.com/u/0/get_video_info";

/// Builds the per-invocation session: one client carrying cookies across all
/// requests, with a browser-like user agent and referer.
pub fn build_session(config: &Config, cookie_header: Option<String>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    headers.insert(REFERER, HeaderValue::from_str(&config.referer)?);
    if let Some(cookie) = cookie_header {
        headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
    }

    // No request timeout: downloads can run long, deadlines stay with the
    // client's defaults.
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    Ok(client)
}

/// Retrieves and decodes the stream manifest for one Drive file id, running
/// the fallback chain when the manifest is absent or empty.
pub struct DriveExtractor {
    client: reqwest::Client,
}

impl DriveExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, file_id: &str) -> Result<RawManifest, DriveError> {
        let body = match self.fetch_video_info(file_id).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Metadata request failed: {}", e);
                String::new()
            }
        };

        if let Some(manifest) = decode_manifest(&body) {
            if !manifest.is_empty() {
                info!(
                    progressive = manifest.progressive_streams.len(),
                    video = manifest.adaptive_video_streams.len(),
                    audio = manifest.adaptive_audio_streams.len(),
                    "Decoded stream manifest"
                );
                return Ok(manifest);
            }
            debug!("Manifest decoded but carries no streams, falling back");
            // Keep a decoded title even when the streams come from fallback.
            if let Some((url, title)) = fallback::resolve(&self.client, &body, file_id).await {
                return Ok(RawManifest::from_direct_url(url, title.or(manifest.title)));
            }
            return Err(DriveError::NoUrlFound);
        }

        debug!("No manifest present, falling back");
        match fallback::resolve(&self.client, &body, file_id).await {
            Some((url, title)) => Ok(RawManifest::from_direct_url(url, title)),
            None => Err(DriveError::NoUrlFound),
        }
    }

    async fn fetch_video_info(&self, file_id: &str) -> Result<String> {
        let url = format!("{VIDEO_INFO_URL}?docid={file_id}&drive_originator_app=303");
        debug!("Fetching video info: {}", url);
        let response = self.client.get(&url).send().await?;
        Ok(response.text().await?)
    }

    /// Probes the download URL for a server-provided filename. Any failure
    /// here falls through to the next filename source.
    pub async fn probe_disposition_filename(&self, url: &str) -> Option<String> {
        let disposition = match self.client.head(url).send().await {
            Ok(response) => response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string()),
            Err(e) => {
                debug!("HEAD probe failed, trying ranged GET: {}", e);
                match self
                    .client
                    .get(url)
                    .header("Range", "bytes=0-0")
                    .send()
                    .await
                {
                    Ok(response) => response
                        .headers()
                        .get(CONTENT_DISPOSITION)
                        .and_then(|v| v.to_str().ok())
                        .map(|v| v.to_string()),
                    Err(e) => {
                        debug!("Ranged GET probe failed: {}", e);
                        None
                    }
                }
            }
        };

        disposition.as_deref().and_then(filename_from_disposition)
    }
}

/// Decodes the query-string-shaped metadata body into a manifest. `None`
/// means the manifest is absent or malformed; both degrade to the fallback
/// resolver rather than erroring.
pub fn decode_manifest(body: &str) -> Option<RawManifest> {
    let player_response = url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "player_response")
        .map(|(_, value)| value.into_owned())?;

    // The value is percent-encoded a second time inside the query string.
    let json_text = match urlencoding::decode(&player_response) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Failed to decode player_response: {}", e);
            return None;
        }
    };

    let document: Value = match serde_json::from_str(&json_text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse player_response JSON: {}", e);
            return None;
        }
    };

    let title = document
        .get("videoDetails")
        .and_then(|d| d.get("title"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string());

    let streaming_data = document.get("streamingData");
    let progressive_streams = stream_list(streaming_data, "formats");
    let adaptive = stream_list(streaming_data, "adaptiveFormats");
    let (adaptive_video_streams, adaptive_audio_streams) = classify_adaptive(adaptive);

    Some(RawManifest {
        title,
        progressive_streams,
        adaptive_video_streams,
        adaptive_audio_streams,
    })
}

/// Missing or non-array values become an empty list; non-object entries are
/// discarded.
fn stream_list(streaming_data: Option<&Value>, key: &str) -> Vec<StreamDescriptor> {
    streaming_data
        .and_then(|sd| sd.get(key))
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.is_object())
                .map(parse_stream)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_stream(entry: &Value) -> StreamDescriptor {
    let format_id = match entry.get("itag") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "unknown".to_string(),
    };

    StreamDescriptor {
        format_id,
        url: entry
            .get("url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        mime_type: entry
            .get("mimeType")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        height: entry
            .get("height")
            .and_then(|v| v.as_u64())
            .map(|h| h as u32),
        quality_label: entry
            .get("qualityLabel")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        bitrate: entry.get("bitrate").and_then(|v| v.as_u64()),
        average_bitrate: entry.get("averageBitrate").and_then(|v| v.as_u64()),
    }
}

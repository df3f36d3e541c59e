use serde::{Deserialize, Serialize};

/// Quality policy applied when no explicit format id is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QualityPolicy {
    /// Prefer an adaptive video+audio pair, falling back to progressive.
    Best,
    /// Only consider progressive (pre-muxed) streams.
    Progressive,
}

/// One candidate stream from the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub height: Option<u32>,
    pub quality_label: Option<String>,
    pub bitrate: Option<u64>,
    pub average_bitrate: Option<u64>,
}

impl StreamDescriptor {
    /// Height in pixels, falling back to the digits of the quality label
    /// ("720p" -> 720). Missing everywhere means 0.
    pub fn effective_height(&self) -> u32 {
        if let Some(h) = self.height {
            return h;
        }
        self.quality_label
            .as_deref()
            .and_then(|label| {
                let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .unwrap_or(0)
    }

    pub fn effective_bitrate(&self) -> u64 {
        self.bitrate.or(self.average_bitrate).unwrap_or(0)
    }

    /// Streams without a URL are not selectable.
    pub fn has_url(&self) -> bool {
        self.url.as_deref().map_or(false, |u| !u.is_empty())
    }
}

/// Decoded structured response: title plus candidate streams, already
/// partitioned into progressive and adaptive video/audio buckets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawManifest {
    pub title: Option<String>,
    pub progressive_streams: Vec<StreamDescriptor>,
    pub adaptive_video_streams: Vec<StreamDescriptor>,
    pub adaptive_audio_streams: Vec<StreamDescriptor>,
}

impl RawManifest {
    /// A manifest with no streams at all is treated the same as an absent
    /// manifest and triggers the fallback resolver.
    pub fn is_empty(&self) -> bool {
        self.progressive_streams.is_empty()
            && self.adaptive_video_streams.is_empty()
            && self.adaptive_audio_streams.is_empty()
    }

    /// Wraps a bare URL recovered by the fallback resolver as a manifest with
    /// one synthetic progressive entry, so selection proceeds uniformly.
    pub fn from_direct_url(url: String, title: Option<String>) -> Self {
        Self {
            title,
            progressive_streams: vec![StreamDescriptor {
                format_id: "direct".to_string(),
                url: Some(url),
                ..Default::default()
            }],
            ..Default::default()
        }
    }
}

/// Outcome of stream selection. Either `progressive` alone, or `video`
/// (optionally with `audio`), or `audio` alone for an explicit audio format,
/// or nothing (selection failed).
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub progressive: Option<StreamDescriptor>,
    pub video: Option<StreamDescriptor>,
    pub audio: Option<StreamDescriptor>,
}

impl SelectionResult {
    pub fn is_empty(&self) -> bool {
        self.progressive.is_none() && self.video.is_none() && self.audio.is_none()
    }
}

use crate::core::{QualityPolicy, RawManifest, SelectionResult, StreamDescriptor};
use tracing::debug;

/// Partitions adaptive format entries into video and audio buckets by mime
/// type prefix, case-insensitively. Entries that are neither are unusable and
/// dropped without a warning. Source order is preserved within each bucket.
pub fn classify_adaptive(
    entries: Vec<StreamDescriptor>,
) -> (Vec<StreamDescriptor>, Vec<StreamDescriptor>) {
    let mut video = Vec::new();
    let mut audio = Vec::new();

    for entry in entries {
        let mime = entry
            .mime_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if mime.starts_with("video/") {
            video.push(entry);
        } else if mime.starts_with("audio/") {
            audio.push(entry);
        }
    }

    (video, audio)
}

/// Picks the final stream combination for a manifest.
///
/// An explicit format id always wins: it expresses definite user intent and
/// is never overridden by the quality heuristics. Otherwise the policy
/// decides: `progressive` considers only pre-muxed streams, `best` prefers an
/// adaptive video+audio pair and falls back to progressive. Height dominates
/// the quality ordering; bitrate breaks ties among equal-resolution encodes.
pub fn select(
    manifest: &RawManifest,
    policy: QualityPolicy,
    explicit_format_id: Option<&str>,
) -> SelectionResult {
    if let Some(format_id) = explicit_format_id {
        return select_explicit(manifest, format_id);
    }

    match policy {
        QualityPolicy::Progressive => select_progressive(manifest),
        QualityPolicy::Best => select_best(manifest),
    }
}

fn select_explicit(manifest: &RawManifest, format_id: &str) -> SelectionResult {
    let matches = |s: &&StreamDescriptor| s.format_id == format_id && s.has_url();

    if let Some(p) = manifest.progressive_streams.iter().find(matches) {
        debug!(format_id, "explicit format matched a progressive stream");
        return SelectionResult {
            progressive: Some(p.clone()),
            ..Default::default()
        };
    }

    if let Some(v) = manifest.adaptive_video_streams.iter().find(matches) {
        // Pair with the loudest audio stream; a missing audio bucket still
        // yields the requested video alone.
        let audio = best_audio(&manifest.adaptive_audio_streams);
        debug!(
            format_id,
            paired_audio = audio.as_ref().map(|a| a.format_id.as_str()),
            "explicit format matched a video-only stream"
        );
        return SelectionResult {
            video: Some(v.clone()),
            audio,
            ..Default::default()
        };
    }

    if let Some(a) = manifest.adaptive_audio_streams.iter().find(matches) {
        debug!(format_id, "explicit format matched an audio-only stream");
        return SelectionResult {
            audio: Some(a.clone()),
            ..Default::default()
        };
    }

    debug!(format_id, "explicit format not found in any bucket");
    SelectionResult::default()
}

fn select_progressive(manifest: &RawManifest) -> SelectionResult {
    SelectionResult {
        progressive: best_by_height_then_bitrate(&manifest.progressive_streams),
        ..Default::default()
    }
}

fn select_best(manifest: &RawManifest) -> SelectionResult {
    let video = best_by_height_then_bitrate(&manifest.adaptive_video_streams);
    if let Some(video) = video {
        if let Some(audio) = best_audio(&manifest.adaptive_audio_streams) {
            return SelectionResult {
                video: Some(video),
                audio: Some(audio),
                ..Default::default()
            };
        }
        // No audio stream to pair with: a video-only result is not playable
        // sound-wise, so fall through to progressive instead.
        debug!("video-only streams present but no audio stream, falling back to progressive");
    }

    select_progressive(manifest)
}

/// Maximum by `(effective_height, effective_bitrate)` lexicographically.
/// Ties keep the first-encountered entry (`>` comparison, not `>=`).
fn best_by_height_then_bitrate(streams: &[StreamDescriptor]) -> Option<StreamDescriptor> {
    let mut best: Option<&StreamDescriptor> = None;
    for s in streams.iter().filter(|s| s.has_url()) {
        let better = match best {
            None => true,
            Some(b) => {
                (s.effective_height(), s.effective_bitrate())
                    > (b.effective_height(), b.effective_bitrate())
            }
        };
        if better {
            best = Some(s);
        }
    }
    best.cloned()
}

/// Maximum by `effective_bitrate`, first-encountered on ties.
fn best_audio(streams: &[StreamDescriptor]) -> Option<StreamDescriptor> {
    let mut best: Option<&StreamDescriptor> = None;
    for s in streams.iter().filter(|s| s.has_url()) {
        let better = match best {
            None => true,
            Some(b) => s.effective_bitrate() > b.effective_bitrate(),
        };
        if better {
            best = Some(s);
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(format_id: &str, mime: &str, height: Option<u32>, bitrate: Option<u64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: format_id.to_string(),
            url: Some(format!("https://example.com/{format_id}")),
            mime_type: Some(mime.to_string()),
            height,
            bitrate,
            ..Default::default()
        }
    }

    fn manifest(
        progressive: Vec<StreamDescriptor>,
        video: Vec<StreamDescriptor>,
        audio: Vec<StreamDescriptor>,
    ) -> RawManifest {
        RawManifest {
            title: None,
            progressive_streams: progressive,
            adaptive_video_streams: video,
            adaptive_audio_streams: audio,
        }
    }

    #[test]
    fn classify_buckets_by_mime_prefix_case_insensitively() {
        let entries = vec![
            stream("137", "Video/MP4; codecs=\"avc1\"", Some(1080), None),
            stream("140", "AUDIO/mp4; codecs=\"mp4a\"", None, Some(128_000)),
            stream("999", "text/vtt", None, None),
            StreamDescriptor {
                format_id: "no-mime".to_string(),
                url: Some("https://example.com/x".to_string()),
                ..Default::default()
            },
        ];
        let (video, audio) = classify_adaptive(entries);
        assert_eq!(video.len(), 1);
        assert_eq!(video[0].format_id, "137");
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].format_id, "140");
    }

    #[test]
    fn classify_preserves_source_order() {
        let entries = vec![
            stream("a1", "audio/webm", None, Some(1)),
            stream("v1", "video/webm", Some(360), None),
            stream("a2", "audio/webm", None, Some(2)),
            stream("v2", "video/webm", Some(720), None),
        ];
        let (video, audio) = classify_adaptive(entries);
        assert_eq!(video.iter().map(|s| s.format_id.as_str()).collect::<Vec<_>>(), ["v1", "v2"]);
        assert_eq!(audio.iter().map(|s| s.format_id.as_str()).collect::<Vec<_>>(), ["a1", "a2"]);
    }

    #[test]
    fn best_picks_highest_pair() {
        let m = manifest(
            vec![stream("18", "video/mp4", Some(360), Some(500))],
            vec![
                stream("136", "video/mp4", Some(720), Some(1_500)),
                stream("137", "video/mp4", Some(1080), Some(2_500)),
            ],
            vec![
                stream("139", "audio/mp4", None, Some(48_000)),
                stream("140", "audio/mp4", None, Some(128_000)),
            ],
        );
        let result = select(&m, QualityPolicy::Best, None);
        assert_eq!(result.video.unwrap().format_id, "137");
        assert_eq!(result.audio.unwrap().format_id, "140");
        assert!(result.progressive.is_none());
    }

    #[test]
    fn best_pair_is_order_independent() {
        let m = manifest(
            vec![],
            vec![
                stream("137", "video/mp4", Some(1080), Some(2_500)),
                stream("136", "video/mp4", Some(720), Some(1_500)),
            ],
            vec![
                stream("140", "audio/mp4", None, Some(128_000)),
                stream("139", "audio/mp4", None, Some(48_000)),
            ],
        );
        let result = select(&m, QualityPolicy::Best, None);
        assert_eq!(result.video.unwrap().format_id, "137");
        assert_eq!(result.audio.unwrap().format_id, "140");
    }

    #[test]
    fn best_refuses_unpaired_video_only() {
        let m = manifest(
            vec![stream("18", "video/mp4", Some(360), Some(500))],
            vec![stream("137", "video/mp4", Some(1080), Some(2_500))],
            vec![],
        );
        let result = select(&m, QualityPolicy::Best, None);
        assert!(result.video.is_none());
        assert!(result.audio.is_none());
        assert_eq!(result.progressive.unwrap().format_id, "18");
    }

    #[test]
    fn best_over_progressive_only_manifest() {
        let m = manifest(
            vec![
                stream("18", "video/mp4", Some(360), Some(500)),
                stream("22", "video/mp4", Some(720), Some(1_200)),
            ],
            vec![],
            vec![],
        );
        let result = select(&m, QualityPolicy::Best, None);
        assert_eq!(result.progressive.unwrap().format_id, "22");
        assert!(result.video.is_none());
        assert!(result.audio.is_none());
    }

    #[test]
    fn bitrate_breaks_height_ties() {
        let m = manifest(
            vec![
                stream("a", "video/mp4", Some(720), Some(900)),
                stream("b", "video/mp4", Some(720), Some(1_100)),
            ],
            vec![],
            vec![],
        );
        let result = select(&m, QualityPolicy::Progressive, None);
        assert_eq!(result.progressive.unwrap().format_id, "b");
    }

    #[test]
    fn full_tie_keeps_first_encountered() {
        let m = manifest(
            vec![
                stream("first", "video/mp4", Some(720), Some(900)),
                stream("second", "video/mp4", Some(720), Some(900)),
            ],
            vec![],
            vec![],
        );
        let result = select(&m, QualityPolicy::Progressive, None);
        assert_eq!(result.progressive.unwrap().format_id, "first");
    }

    #[test]
    fn height_derived_from_quality_label() {
        let low = stream("low", "video/mp4", Some(480), Some(2_000));
        let labelled = StreamDescriptor {
            format_id: "labelled".to_string(),
            url: Some("https://example.com/labelled".to_string()),
            mime_type: Some("video/mp4".to_string()),
            quality_label: Some("720p".to_string()),
            bitrate: Some(1_000),
            ..Default::default()
        };
        let m = manifest(vec![low, labelled], vec![], vec![]);
        let result = select(&m, QualityPolicy::Progressive, None);
        assert_eq!(result.progressive.unwrap().format_id, "labelled");
    }

    #[test]
    fn progressive_policy_ignores_adaptive_streams() {
        let m = manifest(
            vec![stream("18", "video/mp4", Some(360), Some(500))],
            vec![stream("137", "video/mp4", Some(1080), Some(2_500))],
            vec![stream("140", "audio/mp4", None, Some(128_000))],
        );
        let result = select(&m, QualityPolicy::Progressive, None);
        assert_eq!(result.progressive.unwrap().format_id, "18");
        assert!(result.video.is_none());
    }

    #[test]
    fn progressive_policy_on_empty_list_is_empty() {
        let m = manifest(vec![], vec![stream("137", "video/mp4", Some(1080), None)], vec![]);
        let result = select(&m, QualityPolicy::Progressive, None);
        assert!(result.is_empty());
    }

    #[test]
    fn explicit_format_overrides_policy() {
        let m = manifest(
            vec![
                stream("18", "video/mp4", Some(360), Some(500)),
                stream("22", "video/mp4", Some(720), Some(1_200)),
            ],
            vec![],
            vec![],
        );
        let result = select(&m, QualityPolicy::Best, Some("18"));
        assert_eq!(result.progressive.unwrap().format_id, "18");
    }

    #[test]
    fn explicit_video_format_pairs_with_best_audio() {
        let m = manifest(
            vec![],
            vec![
                stream("136", "video/mp4", Some(720), Some(1_500)),
                stream("137", "video/mp4", Some(1080), Some(2_500)),
            ],
            vec![
                stream("139", "audio/mp4", None, Some(48_000)),
                stream("140", "audio/mp4", None, Some(128_000)),
            ],
        );
        let result = select(&m, QualityPolicy::Best, Some("136"));
        assert_eq!(result.video.unwrap().format_id, "136");
        assert_eq!(result.audio.unwrap().format_id, "140");
    }

    #[test]
    fn explicit_video_format_without_audio_stays_alone() {
        let m = manifest(vec![], vec![stream("137", "video/mp4", Some(1080), None)], vec![]);
        let result = select(&m, QualityPolicy::Best, Some("137"));
        assert_eq!(result.video.unwrap().format_id, "137");
        assert!(result.audio.is_none());
    }

    #[test]
    fn explicit_audio_format_returned_alone() {
        let m = manifest(
            vec![stream("18", "video/mp4", Some(360), None)],
            vec![stream("137", "video/mp4", Some(1080), None)],
            vec![stream("140", "audio/mp4", None, Some(128_000))],
        );
        let result = select(&m, QualityPolicy::Best, Some("140"));
        assert_eq!(result.audio.unwrap().format_id, "140");
        assert!(result.video.is_none());
        assert!(result.progressive.is_none());
    }

    #[test]
    fn explicit_format_miss_yields_empty_result() {
        let m = manifest(vec![stream("18", "video/mp4", Some(360), None)], vec![], vec![]);
        let result = select(&m, QualityPolicy::Best, Some("999"));
        assert!(result.is_empty());
    }

    #[test]
    fn streams_without_url_are_never_selected() {
        let mut urlless = stream("22", "video/mp4", Some(720), Some(9_999));
        urlless.url = None;
        let m = manifest(vec![urlless, stream("18", "video/mp4", Some(360), Some(500))], vec![], vec![]);
        let result = select(&m, QualityPolicy::Best, None);
        assert_eq!(result.progressive.unwrap().format_id, "18");

        let mut urlless = stream("137", "video/mp4", Some(1080), None);
        urlless.url = None;
        let m = manifest(vec![], vec![urlless], vec![], );
        let result = select(&m, QualityPolicy::Best, Some("137"));
        assert!(result.is_empty());
    }
}

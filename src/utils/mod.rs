use crate::core::{SelectionResult, StreamDescriptor};
use regex::Regex;
use std::path::Path;

/// Replaces characters invalid on common filesystems with underscores and
/// trims trailing whitespace and dots. An empty result becomes "video".
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_end_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extracts a filename from a Content-Disposition header value. Handles the
/// RFC 5987 extended form (`filename*=UTF-8''...`) and the plain quoted or
/// bare forms.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r"(?i)filename\*\s*=\s*utf-8''([^;]+)") {
        if let Some(caps) = re.captures(header) {
            let raw = caps[1].trim();
            if let Ok(decoded) = urlencoding::decode(raw) {
                let name = decoded.trim();
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
    }

    if let Ok(re) = Regex::new(r#"(?i)filename\s*=\s*"([^"]+)""#) {
        if let Some(caps) = re.captures(header) {
            return Some(caps[1].trim().to_string());
        }
    }

    if let Ok(re) = Regex::new(r"(?i)filename\s*=\s*([^;]+)") {
        if let Some(caps) = re.captures(header) {
            let name = caps[1].trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }

    None
}

/// Container family from a mime type, by substring detection.
pub fn container_for_mime(mime: Option<&str>) -> Option<&'static str> {
    let mime = mime?.to_ascii_lowercase();
    if mime.contains("mp4") {
        Some("mp4")
    } else if mime.contains("webm") {
        Some("webm")
    } else {
        None
    }
}

/// Container hint for a bare fallback URL: its `mime` query parameter, then
/// its path suffix.
pub fn container_for_url(raw: &str) -> Option<&'static str> {
    let parsed = url::Url::parse(raw).ok()?;
    for (key, value) in parsed.query_pairs() {
        if key == "mime" {
            if let Some(ext) = container_for_mime(Some(&value)) {
                return Some(ext);
            }
        }
    }
    if parsed.path().ends_with(".webm") {
        Some("webm")
    } else if parsed.path().ends_with(".mp4") {
        Some("mp4")
    } else {
        None
    }
}

/// Output container for a selection. Muxing two different container families
/// defaults to mkv; everything else stays in its own family, mp4 when the
/// family is unknown.
pub fn container_hint(selection: &SelectionResult) -> &'static str {
    match (&selection.video, &selection.audio) {
        (Some(video), Some(audio)) => {
            let v = container_for_mime(video.mime_type.as_deref());
            let a = container_for_mime(audio.mime_type.as_deref());
            match (v, a) {
                (Some(v), Some(a)) if v == a => v,
                (Some(_), Some(_)) => "mkv",
                _ => "mp4",
            }
        }
        (Some(single), None) | (None, Some(single)) => single_container(single),
        (None, None) => selection
            .progressive
            .as_ref()
            .map(single_container)
            .unwrap_or("mp4"),
    }
}

fn single_container(stream: &StreamDescriptor) -> &'static str {
    container_for_mime(stream.mime_type.as_deref())
        .or_else(|| stream.url.as_deref().and_then(container_for_url))
        .unwrap_or("mp4")
}

/// Final output name. Explicit names win untouched (extension appended only
/// when missing); otherwise the server-provided name, then the sanitized
/// title, then the sanitized identifier, each given the container hint when
/// they lack an extension.
pub fn resolve_filename(
    explicit: Option<&str>,
    disposition_name: Option<&str>,
    title: Option<&str>,
    file_id: &str,
    ext: &str,
) -> String {
    if let Some(name) = explicit {
        if Path::new(name).extension().is_some() {
            return name.to_string();
        }
        return format!("{name}.{ext}");
    }

    if let Some(name) = disposition_name {
        let name = sanitize_filename(name);
        if Path::new(&name).extension().is_some() {
            return name;
        }
        return format!("{name}.{ext}");
    }

    let base = sanitize_filename(title.unwrap_or(file_id));
    format!("{base}.{ext}")
}

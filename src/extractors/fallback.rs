use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use tracing::{debug, warn};

const DRIVE_ORIGIN: &str = "https://drive.google.com";

/// Recovery chain for responses with no usable manifest. Strategies are tried
/// in order, first success wins: a raw segment scan, a regex scan over the
/// decoded body, and finally the direct-download confirmation-token flow.
pub async fn resolve(
    client: &reqwest::Client,
    body: &str,
    file_id: &str,
) -> Option<(String, Option<String>)> {
    let (mut url, title) = scan_raw_segments(body);

    if url.is_none() {
        debug!("raw segment scan found no URL, trying regex scan");
        url = scan_decoded_regex(body);
    }

    if url.is_none() {
        debug!("regex scan found no URL, trying direct-download confirmation flow");
        url = confirm_token_flow(client, file_id).await;
    }

    url.map(|u| (u, title))
}

/// Splits the raw body on `&` and scans segments for a `title=` prefix and a
/// `videoplayback` URL. Finding one does not stop the scan for the other;
/// scanning stops once both are found.
pub fn scan_raw_segments(body: &str) -> (Option<String>, Option<String>) {
    let mut url: Option<String> = None;
    let mut title: Option<String> = None;

    for segment in body.split('&') {
        if title.is_none() {
            if let Some(rest) = segment.strip_prefix("title=") {
                title = Some(percent_decode(rest));
            }
        }
        if url.is_none() && segment.contains("videoplayback") {
            let decoded = percent_decode(segment);
            // Drive sometimes pipe-delimits metadata ahead of the URL.
            let candidate = decoded.rsplit('|').next().unwrap_or(&decoded);
            let candidate = candidate.strip_prefix("url=").unwrap_or(candidate);
            url = Some(candidate.to_string());
        }
        if url.is_some() && title.is_some() {
            break;
        }
    }

    (url, title)
}

/// Fully percent-decodes the body and returns the first HTTP(S) URL
/// containing `videoplayback`, terminated by whitespace or a quote.
pub fn scan_decoded_regex(body: &str) -> Option<String> {
    let mut decoded = body.to_string();
    // Bodies nest several encoding levels; decode to a fixpoint.
    for _ in 0..5 {
        let next = percent_decode(&decoded);
        if next == decoded {
            break;
        }
        decoded = next;
    }

    let re = Regex::new(r#"https?://[^\s"']*videoplayback[^\s"']*"#).ok()?;
    re.find(&decoded).map(|m| m.as_str().to_string())
}

/// Requests the direct-download endpoint for the file id. A
/// content-disposition response means the resolved URL already serves the
/// file; otherwise the interstitial page is scanned for a confirmation token.
pub async fn confirm_token_flow(client: &reqwest::Client, file_id: &str) -> Option<String> {
    let probe_url = direct_download_url(file_id);
    debug!("Requesting direct-download endpoint: {}", probe_url);

    let response = match client.get(&probe_url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Direct-download request failed: {}", e);
            return None;
        }
    };

    if response.headers().contains_key(CONTENT_DISPOSITION) {
        debug!("Direct-download endpoint served the file immediately");
        return Some(response.url().to_string());
    }

    let page = match response.text().await {
        Ok(t) => t,
        Err(e) => {
            warn!("Failed to read interstitial page: {}", e);
            return None;
        }
    };

    let confirmed = confirm_url_from_page(&page, file_id);
    if confirmed.is_none() {
        warn!("No confirmation token found on interstitial page");
    }
    confirmed
}

pub fn direct_download_url(file_id: &str) -> String {
    format!("{DRIVE_ORIGIN}/uc?export=download&id={file_id}")
}

/// Scans an interstitial warning page for a confirmation token: a hidden form
/// field first, then an anchor href carrying `confirm=`.
pub fn confirm_url_from_page(page: &str, file_id: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r#"name="confirm"\s+value="([^"]+)""#) {
        if let Some(caps) = re.captures(page) {
            let token = &caps[1];
            return Some(format!(
                "{DRIVE_ORIGIN}/uc?export=download&confirm={token}&id={file_id}"
            ));
        }
    }

    if let Ok(re) = Regex::new(r#"href="([^"]*confirm=[^"]*)""#) {
        if let Some(caps) = re.captures(page) {
            let href = caps[1].replace("&amp;", "&");
            let absolute = if href.starts_with('/') {
                format!("{DRIVE_ORIGIN}{href}")
            } else {
                href
            };
            return Some(absolute);
        }
    }

    None
}

fn percent_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

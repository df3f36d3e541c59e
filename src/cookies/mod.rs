use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Capability seam for pre-obtained credentials. Sources yield a Cookie
/// header value or nothing; they never abort the invocation.
pub trait CookieSource {
    fn name(&self) -> &'static str;
    fn cookie_header(&self) -> Result<Option<String>>;
}

/// Raw `Cookie:` header string passed on the command line.
pub struct HeaderSource {
    header: String,
}

impl HeaderSource {
    pub fn new(header: String) -> Self {
        Self { header }
    }
}

impl CookieSource for HeaderSource {
    fn name(&self) -> &'static str {
        "cookie-header"
    }

    fn cookie_header(&self) -> Result<Option<String>> {
        let pairs: Vec<String> = self
            .header
            .split(';')
            .map(str::trim)
            .filter(|p| p.contains('='))
            .map(str::to_string)
            .collect();
        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(pairs.join("; ")))
    }
}

/// Cookie file exported from a browser: Netscape `cookies.txt` or the JSON
/// shape written by extensions like Cookie-Editor (a list, or an object with
/// a `cookies` list).
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CookieSource for FileSource {
    fn name(&self) -> &'static str {
        "cookies-file"
    }

    fn cookie_header(&self) -> Result<Option<String>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading cookies file {}", self.path.display()))?;
        let content = content.trim();

        let pairs = if content.starts_with('{') || content.starts_with('[') {
            parse_json_cookies(content)?
        } else {
            parse_netscape_cookies(content)
        };

        debug!("Loaded {} cookies from {}", pairs.len(), self.path.display());
        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs.join("; ")))
        }
    }
}

fn parse_json_cookies(content: &str) -> Result<Vec<String>> {
    let document: serde_json::Value =
        serde_json::from_str(content).context("parsing JSON cookie export")?;
    let list = match &document {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(obj) => obj
            .get("cookies")
            .and_then(|v| v.as_array())
            .map(|a| a.as_slice())
            .unwrap_or(&[]),
        _ => &[],
    };

    Ok(list
        .iter()
        .filter_map(|c| {
            let name = c.get("name")?.as_str()?;
            let value = c.get("value").and_then(|v| v.as_str()).unwrap_or_default();
            Some(format!("{name}={value}"))
        })
        .collect())
}

fn parse_netscape_cookies(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            // #HttpOnly_ lines are real cookies, other comments are not.
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }
            Some(format!("{}={}", fields[5], fields[6]))
        })
        .collect()
}

/// Collects all configured sources into one Cookie header value. A failing
/// source warns and contributes nothing.
pub fn load_cookie_header(sources: &[Box<dyn CookieSource>]) -> Option<String> {
    let mut parts = Vec::new();
    for source in sources {
        match source.cookie_header() {
            Ok(Some(header)) => parts.push(header),
            Ok(None) => {}
            Err(e) => warn!("Failed to load cookies from {}: {}", source.name(), e),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

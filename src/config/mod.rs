use serde::{Deserialize, Serialize};

/// Session defaults for one invocation. A desktop-like user agent and the
/// Drive referer reduce the chance of blocked requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub user_agent: String,
    pub referer: String,
    pub retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://drive.google.com/".to_string(),
            retries: 3,
        }
    }
}

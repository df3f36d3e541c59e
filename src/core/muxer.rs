use crate::core::DriveError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Capability seam for the external merge step, so selection and parsing can
/// be tested without spawning any subprocess.
#[async_trait]
pub trait Muxer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stream-copies `video` and `audio` into a single container at `output`.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DriveError>;
}

/// Shells out to ffmpeg for a stream-copy mux (no re-encoding).
pub struct FfmpegMuxer {
    binary: String,
}

impl FfmpegMuxer {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DriveError> {
        info!(
            "Merging {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );

        let result = Command::new(&self.binary)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => {
                debug!("ffmpeg merge completed");
                Ok(())
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                Err(DriveError::Mux(format!(
                    "ffmpeg exited with {}: {}",
                    out.status,
                    stderr.trim()
                )))
            }
            Err(e) => Err(DriveError::Mux(format!(
                "could not run {} ({}); is it installed and on PATH?",
                self.binary, e
            ))),
        }
    }
}

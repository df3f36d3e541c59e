use crate::config::Config;
use crate::cookies::{self, CookieSource, FileSource, HeaderSource};
use crate::core::downloader::part_path;
use crate::core::{select, Downloader, DriveError, FfmpegMuxer, Muxer, QualityPolicy};
use crate::extractors::{build_session, DriveExtractor};
use crate::utils::{container_hint, resolve_filename};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(name = "drive-dl")]
#[command(about = "Download video files hosted on Google Drive")]
#[command(version)]
pub struct Cli {
    /// Drive file id (e.g. 'abc-Qt12kjmS21kjDm2kjd')
    #[arg(value_name = "FILE_ID")]
    pub file_id: String,

    /// Output file name (default: the title reported by Drive)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Explicit format id (itag) to download
    #[arg(short, long)]
    pub format: Option<String>,

    /// Quality policy when no explicit format is given
    #[arg(short, long, value_enum, default_value = "best")]
    pub quality: QualityPolicy,

    /// Path to a Netscape cookies.txt or JSON cookie export file
    #[arg(long)]
    pub cookies_file: Option<PathBuf>,

    /// Raw Cookie header string (e.g. "SID=...; HSID=...")
    #[arg(long)]
    pub cookie: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        if self.verbose {
            println!("Verbose mode enabled");
        }

        println!("File id: {}", self.file_id);

        let config = Config::default();

        let mut sources: Vec<Box<dyn CookieSource>> = Vec::new();
        if let Some(path) = &self.cookies_file {
            sources.push(Box::new(FileSource::new(path.clone())));
        }
        if let Some(header) = &self.cookie {
            sources.push(Box::new(HeaderSource::new(header.clone())));
        }
        let cookie_header = cookies::load_cookie_header(&sources);

        // One session carries cookies across every request of this invocation.
        let client = build_session(&config, cookie_header)?;
        let extractor = DriveExtractor::new(client.clone());

        println!("Retrieving stream manifest...");
        let manifest = extractor.resolve(&self.file_id).await?;
        if let Some(title) = &manifest.title {
            println!("Title: {}", title);
        }

        let selection = select(&manifest, self.quality, self.format.as_deref());
        if selection.is_empty() {
            return Err(DriveError::SelectionMiss.into());
        }

        let ext = container_hint(&selection);

        // The server-provided name outranks the title, so probe whenever the
        // user gave no explicit name.
        let primary_url = selection
            .progressive
            .as_ref()
            .or(selection.video.as_ref())
            .or(selection.audio.as_ref())
            .and_then(|s| s.url.clone())
            .ok_or(DriveError::SelectionMiss)?;
        let disposition_name = if self.output.is_none() {
            extractor.probe_disposition_filename(&primary_url).await
        } else {
            None
        };

        let filename = resolve_filename(
            self.output.as_deref(),
            disposition_name.as_deref(),
            manifest.title.as_deref(),
            &self.file_id,
            ext,
        );
        let output_path = PathBuf::from(&filename);
        println!("Output file: {}", output_path.display());

        let downloader = Downloader::new(client, config.retries);

        if let Some(stream) = &selection.progressive {
            println!("Selected progressive stream {}", stream.format_id);
            downloader.download(&primary_url, &output_path).await?;
        } else if let Some(video) = &selection.video {
            match &selection.audio {
                Some(audio) => {
                    let audio_url = audio.url.as_deref().ok_or(DriveError::SelectionMiss)?;
                    println!(
                        "Selected video stream {} + audio stream {}",
                        video.format_id, audio.format_id
                    );
                    self.download_and_merge(&downloader, &primary_url, audio_url, &output_path)
                        .await?;
                }
                None => {
                    println!("Selected video-only stream {}", video.format_id);
                    downloader.download(&primary_url, &output_path).await?;
                }
            }
        } else {
            // Explicit audio format.
            println!("Selected audio-only stream");
            downloader.download(&primary_url, &output_path).await?;
        }

        println!("Download completed: {}", output_path.display());
        Ok(())
    }

    async fn download_and_merge(
        &self,
        downloader: &Downloader,
        video_url: &str,
        audio_url: &str,
        output_path: &Path,
    ) -> Result<()> {
        let video_part = part_path(output_path, "video");
        let audio_part = part_path(output_path, "audio");

        // Strictly sequential: audio starts only after video finished.
        println!("Downloading video stream...");
        downloader.download(video_url, &video_part).await?;
        println!("Downloading audio stream...");
        downloader.download(audio_url, &audio_part).await?;

        println!("Merging streams...");
        let muxer = FfmpegMuxer::new();
        let merge = muxer.mux(&video_part, &audio_part, output_path).await;

        // The merge has run; the per-stream temp files go away on both paths.
        remove_quietly(&video_part).await;
        remove_quietly(&audio_part).await;

        if let Err(e) = merge {
            eprintln!("{}", e);
            eprintln!(
                "The streams were downloaded but could not be merged. \
                 Install ffmpeg and run again, or download the video and audio \
                 formats separately with -f and merge them manually."
            );
            return Err(e.into());
        }

        Ok(())
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove temporary file {}: {}", path.display(), e);
    }
}

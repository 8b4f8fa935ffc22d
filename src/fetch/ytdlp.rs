use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::FetchConfig;
use crate::error::{Result, ReelError};
use crate::media::MediaCommand;
use super::VideoSource;

/// yt-dlp backed video source
pub struct YtDlpSource {
    config: FetchConfig,
}

impl YtDlpSource {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Build the video download command
    pub fn video_command(&self, url: &str, destination: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Video download")
            .args(["--no-playlist", "--force-overwrites"])
            .arg("-f")
            .arg(&self.config.video_format)
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("-o")
            .path(destination)
            .arg(url)
            .with_timeout(self.timeout())
    }

    /// Build the subtitle-only download command
    pub fn subtitle_command(&self, url: &str, base: &str, language: &str) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Subtitle download")
            .args(["--no-playlist", "--skip-download", "--write-subs", "--write-auto-subs"])
            .arg("--sub-langs")
            .arg(language)
            .arg("--sub-format")
            .arg("vtt")
            .arg("-o")
            .arg(base)
            .arg("--quiet")
            .arg(url)
            .with_timeout(self.timeout())
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn download_video(&self, url: &str, destination: &Path) -> Result<()> {
        info!("Downloading video {} to {}", url, destination.display());

        self.video_command(url, destination)
            .execute()
            .await
            .map_err(|e| ReelError::Fetch(format!("Failed to download video: {}", e)))?;

        Ok(())
    }

    async fn download_subtitles(&self, url: &str, base: &str, language: &str) -> Result<()> {
        info!("Downloading '{}' subtitles for {}", language, url);

        self.subtitle_command(url, base, language)
            .execute()
            .await
            .map_err(|e| ReelError::Fetch(format!("Failed to download subtitles: {}", e)))?;

        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        MediaCommand::new(&self.config.binary_path, "Version check")
            .arg("--version")
            .with_timeout(Duration::from_secs(30))
            .execute()
            .await
            .map_err(|e| ReelError::Fetch(format!("yt-dlp not available: {}", e)))?;

        info!("yt-dlp is available");
        Ok(())
    }
}

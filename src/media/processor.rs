use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, ReelError};
use super::{MediaCommandBuilder, MediaProcessorTrait};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(
            &config.binary_path,
            &config.probe_binary_path,
            Duration::from_secs(config.timeout_secs),
        );

        Self { command_builder }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn extract_frames(
        &self,
        video_path: &Path,
        output_pattern: &Path,
        fps: f64,
    ) -> Result<()> {
        info!("Extracting frames from {} at {} fps", video_path.display(), fps);

        let command = self.command_builder.extract_frames(video_path, output_pattern, fps);
        command.execute().await?;

        info!("Frame extraction completed");
        Ok(())
    }

    async fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        let output = self.command_builder.probe_duration(video_path).execute().await?;
        parse_duration(&output.stdout)
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| ReelError::Media(format!("Media processor not available: {}", e)))?;

        info!("Media processor is available");
        Ok(())
    }
}

/// Parse ffprobe's bare `format=duration` output
fn parse_duration(stdout: &str) -> Result<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    debug!("ffprobe duration output: {}", line);

    match line.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(ReelError::Media(format!("Unexpected duration from ffprobe: '{}'", line))),
    }
}

// Retrieval of the remote video and its subtitle track
//
// The pipeline treats the hosting site as a black box: fetch the video bytes
// to a path, fetch a subtitle track next to a base name.

pub mod ytdlp;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use ytdlp::YtDlpSource;

use crate::config::FetchConfig;
use crate::error::Result;

/// Source of a video and its subtitles, addressed by URL
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Download a single video stream to `destination`
    async fn download_video(&self, url: &str, destination: &Path) -> Result<()>;

    /// Download the subtitle track for `language` as `<base>*.vtt`,
    /// preferring manual subtitles and falling back to auto-generated ones
    async fn download_subtitles(&self, url: &str, base: &str, language: &str) -> Result<()>;

    /// Check that the downloader is usable
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for the default video source
pub struct VideoSourceFactory;

impl VideoSourceFactory {
    pub fn create_source(config: FetchConfig) -> Arc<dyn VideoSource> {
        Arc::new(YtDlpSource::new(config))
    }
}

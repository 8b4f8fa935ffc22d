// Media processing on top of ffmpeg/ffprobe
//
// - Commands: external tool invocation with timeouts
// - Processor: ffmpeg-backed implementation of MediaProcessorTrait
// - Sampler: turns a video into an ordered sequence of still frames

pub mod commands;
pub mod processor;
pub mod sampler;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;
pub use sampler::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Write one image per sampled instant to `output_pattern` (printf-style ordinal)
    async fn extract_frames(
        &self,
        video_path: &Path,
        output_pattern: &Path,
        fps: f64,
    ) -> Result<()>;

    /// Container duration in seconds
    async fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessorTrait> {
        Arc::new(processor::MediaProcessorImpl::new(config))
    }
}

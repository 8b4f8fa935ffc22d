use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::MediaConfig;
use crate::error::{Result, ReelError};
use super::MediaProcessorTrait;

pub const FRAME_PREFIX: &str = "frame_";
pub const FRAME_EXTENSION: &str = "png";

/// Narrowest zero padding used for frame ordinals
const MIN_ORDINAL_WIDTH: usize = 4;
/// Padding used when the duration cannot be probed
const FALLBACK_ORDINAL_WIDTH: usize = 6;

/// One sampled still image
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 0-based position in the sampled sequence
    pub index: usize,
    pub path: PathBuf,
    /// Approximate playback position, `index / sample_rate`
    pub timestamp: Duration,
}

impl Frame {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Number of frames a `duration_secs` long video yields at `rate` frames per second
pub fn expected_frame_count(duration_secs: f64, rate: f64) -> usize {
    (duration_secs * rate).floor().max(0.0) as usize
}

/// Approximate playback position of the frame at `index`; zero for a non-positive rate
pub fn frame_timestamp(index: usize, rate: f64) -> Duration {
    Duration::try_from_secs_f64(index as f64 / rate).unwrap_or_default()
}

/// File name of the frame at `index` with the given ordinal width (ordinals start at 1)
pub fn frame_file_name(index: usize, width: usize) -> String {
    format!("{}{:0width$}.{}", FRAME_PREFIX, index + 1, FRAME_EXTENSION, width = width)
}

/// Ordinal width wide enough that lexicographic order equals temporal order
fn ordinal_width(expected: Option<usize>) -> usize {
    match expected {
        Some(count) => (count + 1).to_string().len().max(MIN_ORDINAL_WIDTH),
        None => FALLBACK_ORDINAL_WIDTH,
    }
}

/// Samples still frames from a local video at a fixed temporal rate
pub struct FrameSampler {
    frames_dir: PathBuf,
    sample_rate: f64,
    media: Arc<dyn MediaProcessorTrait>,
}

impl FrameSampler {
    pub fn new(config: &MediaConfig, media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self {
            frames_dir: config.frames_dir.clone(),
            sample_rate: config.sample_rate,
            media,
        }
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Recreate the frames directory and fill it with the sampled frames.
    ///
    /// On failure the directory is removed so no partial frame set survives.
    pub async fn sample(&self, video_path: &Path) -> Result<Vec<Frame>> {
        if !video_path.exists() {
            return Err(ReelError::FileNotFound(video_path.display().to_string()));
        }

        let expected = match self.media.probe_duration(video_path).await {
            Ok(duration) => {
                debug!("Video duration: {:.2}s", duration);
                Some(expected_frame_count(duration, self.sample_rate))
            }
            Err(e) => {
                debug!("Could not probe video duration: {}", e);
                None
            }
        };

        self.reset_frames_dir().await?;

        let width = ordinal_width(expected);
        let pattern = self
            .frames_dir
            .join(format!("{}%0{}d.{}", FRAME_PREFIX, width, FRAME_EXTENSION));

        if let Err(e) = self.media.extract_frames(video_path, &pattern, self.sample_rate).await {
            self.discard_frames_dir().await;
            return Err(e);
        }

        let frames = match list_frames(&self.frames_dir, self.sample_rate) {
            Ok(frames) => frames,
            Err(e) => {
                self.discard_frames_dir().await;
                return Err(e);
            }
        };

        if let Some(expected) = expected {
            if frames.len().abs_diff(expected) > 1 {
                warn!(
                    "Sampled {} frames, expected about {} at {} fps",
                    frames.len(),
                    expected,
                    self.sample_rate
                );
            }
        }

        info!("Sampled {} frames into {}", frames.len(), self.frames_dir.display());
        Ok(frames)
    }

    async fn reset_frames_dir(&self) -> Result<()> {
        if fs::metadata(&self.frames_dir).await.is_ok() {
            fs::remove_dir_all(&self.frames_dir).await?;
        }
        fs::create_dir_all(&self.frames_dir).await?;
        Ok(())
    }

    async fn discard_frames_dir(&self) {
        if let Err(e) = fs::remove_dir_all(&self.frames_dir).await {
            warn!("Failed to clean up {}: {}", self.frames_dir.display(), e);
        }
    }
}

/// List sampled frame images in `dir`, ordered by file name
pub fn list_frames(dir: &Path, sample_rate: f64) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ReelError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("Failed to read {}", dir.display()))
            }))
        })?;

        let path = entry.path();
        let is_frame = entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(FRAME_EXTENSION);
        if !is_frame {
            continue;
        }

        let index = frames.len();
        frames.push(Frame {
            index,
            path: path.to_path_buf(),
            timestamp: frame_timestamp(index, sample_rate),
        });
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Writes `count` empty frame files following the requested pattern
    struct FakeMedia {
        duration: Option<f64>,
        count: usize,
        fail: bool,
        patterns: Mutex<Vec<PathBuf>>,
    }

    impl FakeMedia {
        fn new(duration: Option<f64>, count: usize) -> Self {
            Self { duration, count, fail: false, patterns: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl MediaProcessorTrait for FakeMedia {
        async fn extract_frames(&self, _video: &Path, pattern: &Path, _fps: f64) -> Result<()> {
            self.patterns.lock().unwrap().push(pattern.to_path_buf());
            let dir = pattern.parent().unwrap();
            let name = pattern.file_name().unwrap().to_string_lossy().to_string();
            let width: usize = name
                .trim_start_matches(FRAME_PREFIX)
                .trim_start_matches("%0")
                .trim_end_matches("d.png")
                .parse()
                .unwrap();
            for i in 0..self.count {
                std::fs::write(dir.join(frame_file_name(i, width)), b"png").unwrap();
            }
            if self.fail {
                return Err(ReelError::Media("decode failed".to_string()));
            }
            Ok(())
        }

        async fn probe_duration(&self, _video: &Path) -> Result<f64> {
            self.duration.ok_or_else(|| ReelError::Media("no duration".to_string()))
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }
    }

    fn setup(rate: f64, media: FakeMedia) -> (tempfile::TempDir, PathBuf, FrameSampler) {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, b"video").unwrap();
        let config = MediaConfig {
            frames_dir: dir.path().join("frames"),
            sample_rate: rate,
            ..MediaConfig::default()
        };
        let sampler = FrameSampler::new(&config, Arc::new(media));
        (dir, video, sampler)
    }

    #[test]
    fn test_expected_frame_count() {
        assert_eq!(expected_frame_count(10.0, 0.5), 5);
        assert_eq!(expected_frame_count(10.9, 1.0), 10);
        assert_eq!(expected_frame_count(3.0, 0.25), 0);
    }

    #[test]
    fn test_frame_timestamp() {
        assert_eq!(frame_timestamp(3, 0.5), Duration::from_secs(6));
        assert_eq!(frame_timestamp(0, 0.0), Duration::ZERO);
        assert_eq!(frame_timestamp(2, 0.0), Duration::ZERO);
        assert_eq!(frame_timestamp(2, -1.0), Duration::ZERO);
    }

    #[test]
    fn test_frame_file_name_sorts_chronologically() {
        let names: Vec<String> = (0..120).map(|i| frame_file_name(i, 4)).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "frame_0001.png");
    }

    #[test]
    fn test_ordinal_width_grows_for_long_videos() {
        assert_eq!(ordinal_width(Some(5)), 4);
        assert_eq!(ordinal_width(Some(9999)), 5);
        assert_eq!(ordinal_width(None), FALLBACK_ORDINAL_WIDTH);
    }

    #[tokio::test]
    async fn test_sample_ten_second_video_at_half_rate() {
        let (_dir, video, sampler) = setup(0.5, FakeMedia::new(Some(10.0), 5));

        let frames = sampler.sample(&video).await.unwrap();

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].file_name(), "frame_0001.png");
        assert_eq!(frames[4].timestamp, Duration::from_secs(8));
        assert!(frames.windows(2).all(|w| w[0].file_name() < w[1].file_name()));
    }

    #[tokio::test]
    async fn test_sample_clears_stale_frames() {
        let (_dir, video, sampler) = setup(1.0, FakeMedia::new(Some(2.0), 2));
        std::fs::create_dir_all(sampler.frames_dir()).unwrap();
        std::fs::write(sampler.frames_dir().join("frame_0099.png"), b"stale").unwrap();

        let frames = sampler.sample(&video).await.unwrap();

        assert_eq!(frames.len(), 2);
        assert!(!sampler.frames_dir().join("frame_0099.png").exists());
    }

    #[tokio::test]
    async fn test_sample_failure_removes_partial_frames() {
        let mut media = FakeMedia::new(None, 3);
        media.fail = true;
        let (_dir, video, sampler) = setup(1.0, media);

        let result = sampler.sample(&video).await;

        assert!(matches!(result, Err(ReelError::Media(_))));
        assert!(!sampler.frames_dir().exists());
    }

    #[tokio::test]
    async fn test_sample_missing_video_is_fatal() {
        let (dir, _video, sampler) = setup(1.0, FakeMedia::new(None, 0));
        let result = sampler.sample(&dir.path().join("absent.mp4")).await;
        assert!(matches!(result, Err(ReelError::FileNotFound(_))));
    }

    #[test]
    fn test_list_frames_skips_non_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame_0002.png"), b"").unwrap();
        std::fs::write(dir.path().join("frame_0001.png"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let frames = list_frames(dir.path(), 2.0).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].file_name(), "frame_0001.png");
        assert_eq!(frames[1].timestamp, Duration::from_millis(500));
    }
}

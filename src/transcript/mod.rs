// Subtitle track retrieval and normalization into timed captions

pub mod vtt;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub use vtt::parse_vtt;

use crate::config::FetchConfig;
use crate::error::{Result, ReelError};
use crate::fetch::VideoSource;

const SUBTITLE_EXTENSION: &str = "vtt";

/// Position in the media timeline, millisecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timecode(u64);

impl Timecode {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for Timecode {
    /// `HH:MM:SS.mmm`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let millis = self.0 % 1_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    }
}

/// One timed subtitle entry; `start <= end` always holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub start: Timecode,
    pub end: Timecode,
    pub text: String,
}

impl Caption {
    /// Whether the caption overlaps the closed interval `[from, to]` (seconds)
    pub fn overlaps(&self, from: f64, to: f64) -> bool {
        self.start.as_secs_f64() <= to && self.end.as_secs_f64() >= from
    }
}

/// Downloads a video's subtitle track and parses it into captions
pub struct TranscriptParser {
    config: FetchConfig,
    source: Arc<dyn VideoSource>,
}

impl TranscriptParser {
    pub fn new(config: FetchConfig, source: Arc<dyn VideoSource>) -> Self {
        Self { config, source }
    }

    /// Fetch and parse the subtitle track for `url`.
    ///
    /// Fails with [`ReelError::NoSubtitles`] when the download leaves no
    /// `<base>*.vtt` file behind.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Caption>> {
        let base = &self.config.subtitle_base;

        let stale = remove_subtitle_files(base).await?;
        if stale > 0 {
            debug!("Removed {} subtitle files from a previous run", stale);
        }

        self.source
            .download_subtitles(url, base, &self.config.subtitle_language)
            .await?;

        let files = find_subtitle_files(base)?;
        let transcript_path = files.first().ok_or(ReelError::NoSubtitles)?;
        if files.len() > 1 {
            debug!("Found {} subtitle files, using {}", files.len(), transcript_path.display());
        }

        info!("Parsing subtitles from {}", transcript_path.display());
        let content = fs::read_to_string(transcript_path).await?;
        let captions = parse_vtt(&content)?;

        info!("Parsed {} captions", captions.len());
        Ok(captions)
    }
}

/// Split a subtitle base like `work/transcript` into its directory and file prefix
fn split_base(base: &str) -> (PathBuf, String) {
    let path = Path::new(base);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    (dir, prefix)
}

/// All `<base>*.vtt` files, sorted by name
pub fn find_subtitle_files(base: &str) -> Result<Vec<PathBuf>> {
    let (dir, prefix) = split_base(base);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        let is_subtitle = path.is_file()
            && name.starts_with(&prefix)
            && path.extension().and_then(|e| e.to_str()) == Some(SUBTITLE_EXTENSION);
        if is_subtitle {
            matches.push(path);
        }
    }

    matches.sort();
    Ok(matches)
}

/// Remove every `<base>*.vtt` file, returning how many were removed
pub async fn remove_subtitle_files(base: &str) -> Result<usize> {
    let mut removed = 0;
    for path in find_subtitle_files(base)? {
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove stale subtitle {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

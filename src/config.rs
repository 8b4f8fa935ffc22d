use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, ReelError};

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const FRAME_RATE_ENV: &str = "FRAME_RATE";
pub const OUTPUT_ENV: &str = "CODEREEL_OUTPUT";

fn default_command_timeout_secs() -> u64 {
    600
}

fn default_concurrency() -> usize {
    1
}

fn default_analysis_temperature() -> f32 {
    0.7
}

fn default_analysis_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to the yt-dlp binary
    pub binary_path: String,
    /// Where the downloaded video is stored (overwritten each run)
    pub video_path: PathBuf,
    /// yt-dlp format selector for the single downloaded stream
    pub video_format: String,
    /// Output template base for the subtitle track; files match `<base>*.vtt`
    pub subtitle_base: String,
    /// Subtitle language to request (manual first, auto-generated as fallback)
    pub subtitle_language: String,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary, used to sanity check the sampled frame count
    pub probe_binary_path: String,
    /// Directory recreated on every run to hold the sampled frames
    pub frames_dir: PathBuf,
    /// Frames sampled per second of playback; 0.5 = one frame every two seconds
    pub sample_rate: f64,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Path to tesseract binary
    pub binary_path: String,
    pub language: String,
    /// Tesseract page segmentation mode; 6 = a single uniform block of text
    pub page_segmentation_mode: u8,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    pub model: String,
    /// Read from the environment only; never written back to disk
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Retries for transport failures, 429 and 5xx responses
    pub max_retries: u32,
    /// Maximum model calls in flight; output order is always input order
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub context_window: ContextWindow,
    /// Sampling for the optional content analysis report
    #[serde(default = "default_analysis_temperature")]
    pub analysis_temperature: f32,
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,
}

/// Per-request sampling parameters sent with a chat completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Which captions are given to the model alongside a frame's text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContextWindow {
    /// Every caption of the transcript, regardless of the frame's position
    #[default]
    Full,
    /// Only captions overlapping `[t - seconds, t + seconds]` around the frame timestamp
    Around { seconds: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Consolidated source listing, overwritten each run
    pub path: PathBuf,
    /// Optional markdown report with transcript and frame text analysis
    #[serde(default)]
    pub analysis_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            video_path: PathBuf::from("downloaded_video.mp4"),
            video_format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4".to_string(),
            subtitle_base: "transcript".to_string(),
            subtitle_language: "en".to_string(),
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_binary_path: "ffprobe".to_string(),
            frames_dir: PathBuf::from("frames"),
            sample_rate: 1.0,
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary_path: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 6,
            timeout_secs: 60,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-70b-versatile".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 1000,
            timeout_secs: 120,
            max_retries: 0,
            concurrency: default_concurrency(),
            context_window: ContextWindow::Full,
            analysis_temperature: default_analysis_temperature(),
            analysis_max_tokens: default_analysis_max_tokens(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("consolidated_code.py"),
            analysis_path: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn consolidation_sampling(&self) -> Sampling {
        Sampling { temperature: self.temperature, max_tokens: self.max_tokens }
    }

    pub fn analysis_sampling(&self) -> Sampling {
        Sampling { temperature: self.analysis_temperature, max_tokens: self.analysis_max_tokens }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReelError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `GROQ_API_KEY`, `FRAME_RATE` and `CODEREEL_OUTPUT` from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, so callers are not tied to the process environment
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key.trim().to_string());
        }

        if let Some(rate) = lookup(FRAME_RATE_ENV) {
            self.media.sample_rate = rate.trim().parse().map_err(|_| {
                ReelError::Config(format!("{} must be a number, got '{}'", FRAME_RATE_ENV, rate))
            })?;
        }

        if let Some(path) = lookup(OUTPUT_ENV).filter(|p| !p.trim().is_empty()) {
            self.output.path = PathBuf::from(path.trim());
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.media.sample_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ReelError::Config(format!(
                "Sample rate must be a positive number of frames per second, got {}",
                rate
            )));
        }

        for sampling in [self.llm.consolidation_sampling(), self.llm.analysis_sampling()] {
            if sampling.max_tokens == 0 {
                return Err(ReelError::Config("max_tokens must be greater than zero".to_string()));
            }

            if !(0.0..=2.0).contains(&sampling.temperature) {
                return Err(ReelError::Config(format!(
                    "Temperature must be within 0.0..=2.0, got {}",
                    sampling.temperature
                )));
            }
        }

        if self.llm.concurrency == 0 {
            return Err(ReelError::Config("concurrency must be at least 1".to_string()));
        }

        if let ContextWindow::Around { seconds } = self.llm.context_window {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ReelError::Config(format!(
                    "Context window must be a non-negative number of seconds, got {}",
                    seconds
                )));
            }
        }

        Ok(())
    }
}

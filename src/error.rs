use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Download error: {0}")]
    Fetch(String),

    #[error("No subtitle file was downloaded. The video might not have subtitles available.")]
    NoSubtitles,

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Subtitle parsing error at line {line}: {message}")]
    Subtitle { line: usize, message: String },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0} timed out after {1}s")]
    Timeout(String, u64),
}

pub type Result<T> = std::result::Result<T, ReelError>;

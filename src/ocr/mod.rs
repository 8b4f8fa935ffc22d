// Text extraction from sampled frames
//
// - Preprocess: grayscale + Otsu binarization
// - Tesseract: TextRecognizer backed by the tesseract CLI
// - FrameTextExtractor: per-frame OCR with blank filtering

pub mod preprocess;
pub mod tesseract;

use async_trait::async_trait;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use tesseract::TesseractRecognizer;

use crate::config::OcrConfig;
use crate::error::{Result, ReelError};
use crate::media::{list_frames, Frame};
use crate::progress::stage_bar;

/// Maps a preprocessed image to raw recognized text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: GrayImage) -> Result<String>;

    async fn check_availability(&self) -> Result<()>;
}

/// Factory for the default recognizer
pub struct TextRecognizerFactory;

impl TextRecognizerFactory {
    pub fn create_recognizer(config: OcrConfig) -> Arc<dyn TextRecognizer> {
        Arc::new(TesseractRecognizer::new(config))
    }
}

/// Identifies the frame a piece of text came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRef {
    pub index: usize,
    pub file_name: String,
    pub timestamp: Duration,
}

impl From<&Frame> for FrameRef {
    fn from(frame: &Frame) -> Self {
        Self {
            index: frame.index,
            file_name: frame.file_name(),
            timestamp: frame.timestamp,
        }
    }
}

/// Non-blank, trimmed OCR output of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFrameText {
    pub frame: FrameRef,
    pub text: String,
}

/// Runs OCR over sampled frames, dropping frames without legible text
pub struct FrameTextExtractor {
    sample_rate: f64,
    recognizer: Arc<dyn TextRecognizer>,
}

impl FrameTextExtractor {
    pub fn new(sample_rate: f64, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { sample_rate, recognizer }
    }

    /// OCR every `*.png` in `frames_dir`, in file name order.
    ///
    /// A missing or unreadable directory is fatal; a frame that fails to
    /// decode or recognize is logged and skipped.
    pub async fn extract(&self, frames_dir: &Path) -> Result<Vec<ExtractedFrameText>> {
        if !frames_dir.is_dir() {
            return Err(ReelError::FileNotFound(format!(
                "Frames directory not found: {}",
                frames_dir.display()
            )));
        }

        let frames = list_frames(frames_dir, self.sample_rate)?;
        Ok(self.extract_frames(&frames).await)
    }

    /// OCR an already listed frame sequence, preserving its order
    pub async fn extract_frames(&self, frames: &[Frame]) -> Vec<ExtractedFrameText> {
        info!("Running OCR on {} frames", frames.len());
        let pb = stage_bar(frames.len(), "Running OCR");

        let mut extracted = Vec::new();
        for frame in frames {
            match self.extract_frame(frame).await {
                Ok(Some(text)) => extracted.push(ExtractedFrameText {
                    frame: FrameRef::from(frame),
                    text,
                }),
                Ok(None) => debug!("No text in {}", frame.file_name()),
                Err(e) => warn!("Error processing frame {}: {}", frame.file_name(), e),
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("OCR complete: {} of {} frames contain text", extracted.len(), frames.len());
        extracted
    }

    async fn extract_frame(&self, frame: &Frame) -> Result<Option<String>> {
        let path = frame.path.clone();
        let prepared = tokio::task::spawn_blocking(move || preprocess::prepare_for_ocr(&path))
            .await
            .map_err(|e| ReelError::Ocr(format!("Preprocessing task failed: {}", e)))??;

        let raw = self.recognizer.recognize(prepared).await?;
        let text = raw.trim();

        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

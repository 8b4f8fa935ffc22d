use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::OcrConfig;
use crate::error::{Result, ReelError};
use crate::media::MediaCommand;
use super::TextRecognizer;

/// Tesseract CLI recognizer
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// `tesseract <image> stdout -l <lang> --psm <mode>`
    pub fn command(&self, image_path: &std::path::Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Text recognition")
            .path(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(self.config.page_segmentation_mode.to_string())
            .with_timeout(Duration::from_secs(self.config.timeout_secs))
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: GrayImage) -> Result<String> {
        // PNG encoding and the temp file write stay off the async workers
        let file = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let file = tempfile::Builder::new()
                .prefix("codereel-ocr-")
                .suffix(".png")
                .tempfile()?;
            image.save_with_format(file.path(), ImageFormat::Png)?;
            Ok(file)
        })
        .await
        .map_err(|e| ReelError::Ocr(format!("Image encoding task failed: {}", e)))??;

        let output = self
            .command(file.path())
            .execute()
            .await
            .map_err(|e| ReelError::Ocr(e.to_string()))?;

        Ok(output.stdout)
    }

    async fn check_availability(&self) -> Result<()> {
        MediaCommand::new(&self.config.binary_path, "Version check")
            .arg("--version")
            .with_timeout(Duration::from_secs(30))
            .execute()
            .await
            .map_err(|e| ReelError::Ocr(format!("tesseract not available: {}", e)))?;

        info!("tesseract is available");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_command_uses_single_block_mode() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let cmd = recognizer.command(Path::new("/tmp/frame.png"));

        assert_eq!(cmd.binary_path, "tesseract");
        assert_eq!(cmd.args, vec!["/tmp/frame.png", "stdout", "-l", "eng", "--psm", "6"]);
    }

    /// Stand-in for tesseract that checks it was handed a non-empty PNG
    #[cfg(unix)]
    fn fake_tesseract(dir: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("tesseract");
        std::fs::write(
            &script,
            "#!/bin/sh\nhead -c 8 \"$1\" | grep -q PNG || exit 3\n[ \"$2\" = stdout ] || exit 4\necho 'def f():'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recognize_hands_encoded_png_to_binary() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            binary_path: fake_tesseract(dir.path()),
            ..OcrConfig::default()
        };
        let recognizer = TesseractRecognizer::new(config);

        let text = recognizer
            .recognize(GrayImage::from_pixel(16, 8, image::Luma([255])))
            .await
            .unwrap();

        assert_eq!(text.trim(), "def f():");
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let config = OcrConfig {
            binary_path: "definitely-not-tesseract-7f3a".to_string(),
            ..OcrConfig::default()
        };

        let result = TesseractRecognizer::new(config)
            .recognize(GrayImage::new(4, 4))
            .await;

        assert!(matches!(result, Err(ReelError::Ocr(_))));
    }
}

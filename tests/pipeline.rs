//! End-to-end runs of the workflow against in-process collaborators

use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;
use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use codereel::config::Config;
use codereel::consolidate::{ChatMessage, LanguageModel, ModelError, Sampling};
use codereel::error::{ReelError, Result};
use codereel::fetch::VideoSource;
use codereel::media::{frame_file_name, MediaProcessorTrait};
use codereel::ocr::TextRecognizer;
use codereel::workflow::{Collaborators, Workflow};

const TRACK: &str = "WEBVTT\n\n\
00:00:00.000 --> 00:00:03.000\nToday we write a function\n\n\
00:00:03.000 --> 00:00:06.000\nit is called f\n\n\
00:00:06.000 --> 00:00:10.000\nand it returns one\n";

/// Frame widths stand in for rendered content; see `WidthRecognizer`
const FRAME_WIDTHS: [u32; 5] = [10, 11, 12, 10, 15];

struct StubSource {
    subtitles: bool,
}

#[async_trait]
impl VideoSource for StubSource {
    async fn download_video(&self, _url: &str, destination: &Path) -> Result<()> {
        std::fs::write(destination, b"ten seconds of video")?;
        Ok(())
    }

    async fn download_subtitles(&self, _url: &str, base: &str, language: &str) -> Result<()> {
        if self.subtitles {
            std::fs::write(format!("{}.{}.vtt", base, language), TRACK)?;
        }
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// A ten second video; writes one frame per sampled instant
struct StubMedia;

#[async_trait]
impl MediaProcessorTrait for StubMedia {
    async fn extract_frames(&self, _video: &Path, pattern: &Path, fps: f64) -> Result<()> {
        assert_eq!(fps, 0.5);
        let dir = pattern.parent().expect("pattern has a directory");
        for (i, width) in FRAME_WIDTHS.iter().enumerate() {
            GrayImage::from_fn(*width, 8, |x, _| if x % 2 == 0 { Luma([20]) } else { Luma([230]) })
                .save(dir.join(frame_file_name(i, 4)))?;
        }
        Ok(())
    }

    async fn probe_duration(&self, _video: &Path) -> Result<f64> {
        Ok(10.0)
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

struct WidthRecognizer;

#[async_trait]
impl TextRecognizer for WidthRecognizer {
    async fn recognize(&self, image: GrayImage) -> Result<String> {
        Ok(match image.width() {
            11 => "  def f():\n".to_string(),
            15 => "return 1\n".to_string(),
            _ => " \n".to_string(),
        })
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Echoes the snippet back; optionally fails every second call
#[derive(Default)]
struct EchoModel {
    fail_every_second: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _sampling: Sampling,
    ) -> std::result::Result<String, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_every_second && call % 2 == 1 {
            return Err(ModelError::Status { code: 503, body: "unavailable".to_string() });
        }

        let prompt = &messages[0].content;
        let start = prompt.find("Code Snippet:\n").expect("snippet marker") + "Code Snippet:\n".len();
        let end = prompt.find("\n\nConsolidate").expect("instruction marker");
        Ok(prompt[start..end].to_string())
    }
}

fn config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.fetch.video_path = temp.child("downloaded_video.mp4").path().to_path_buf();
    config.fetch.subtitle_base = temp.child("transcript").path().to_string_lossy().to_string();
    config.media.frames_dir = temp.child("frames").path().to_path_buf();
    config.media.sample_rate = 0.5;
    config.output.path = temp.child("consolidated_code.py").path().to_path_buf();
    config
}

fn workflow(config: Config, subtitles: bool, model: Arc<EchoModel>) -> Workflow {
    Workflow::new(
        config,
        Collaborators {
            source: Arc::new(StubSource { subtitles }),
            media: Arc::new(StubMedia),
            recognizer: Arc::new(WidthRecognizer),
            model,
        },
    )
}

#[tokio::test]
async fn test_ten_second_video_yields_both_snippets_in_order() {
    let temp = TempDir::new().unwrap();
    let model = Arc::new(EchoModel::default());

    let summary = workflow(config(&temp), true, model.clone())
        .run("https://www.youtube.com/watch?v=tutorial")
        .await
        .unwrap();

    assert_eq!(summary.frames_sampled, 5);
    assert_eq!(summary.captions, 3);
    assert_eq!(summary.frames_with_text, 2);
    assert_eq!(summary.contributed, 2);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);

    temp.child("consolidated_code.py").assert("def f():\n\nreturn 1\n\n");
    assert_eq!(std::fs::read_dir(temp.child("frames").path()).unwrap().count(), 5);
}

#[tokio::test]
async fn test_failed_model_calls_leave_no_placeholder() {
    let temp = TempDir::new().unwrap();
    let model = Arc::new(EchoModel { fail_every_second: true, ..EchoModel::default() });

    let summary = workflow(config(&temp), true, model)
        .run("https://www.youtube.com/watch?v=tutorial")
        .await
        .unwrap();

    assert_eq!(summary.contributed, 1);
    assert_eq!(summary.skipped, 1);
    temp.child("consolidated_code.py").assert("def f():\n\n");
}

#[tokio::test]
async fn test_missing_subtitles_abort_before_consolidation() {
    let temp = TempDir::new().unwrap();
    let model = Arc::new(EchoModel::default());

    let result = workflow(config(&temp), false, model.clone())
        .run("https://www.youtube.com/watch?v=silent")
        .await;

    assert!(matches!(result, Err(ReelError::NoSubtitles)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(!temp.child("consolidated_code.py").path().exists());
}

#[tokio::test]
async fn test_rerun_replaces_previous_artifacts() {
    let temp = TempDir::new().unwrap();
    temp.child("frames/frame_0042.png").write_binary(b"stale").unwrap();
    temp.child("consolidated_code.py").write_str("old output").unwrap();

    workflow(config(&temp), true, Arc::new(EchoModel::default()))
        .run("https://www.youtube.com/watch?v=tutorial")
        .await
        .unwrap();

    assert!(!temp.child("frames/frame_0042.png").path().exists());
    temp.child("consolidated_code.py").assert("def f():\n\nreturn 1\n\n");
}

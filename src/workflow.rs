use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::consolidate::{
    ConsolidationReport, Consolidator, ContentAnalyzer, LanguageModel, LanguageModelFactory,
};
use crate::error::{Result, ReelError};
use crate::fetch::{VideoSource, VideoSourceFactory};
use crate::media::{FrameSampler, MediaProcessorFactory, MediaProcessorTrait};
use crate::ocr::{FrameTextExtractor, TextRecognizer, TextRecognizerFactory};
use crate::transcript::TranscriptParser;

/// External collaborators the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn VideoSource>,
    pub media: Arc<dyn MediaProcessorTrait>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub model: Arc<dyn LanguageModel>,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub frames_sampled: usize,
    pub captions: usize,
    pub frames_with_text: usize,
    pub contributed: usize,
    pub skipped: usize,
    pub output_path: PathBuf,
}

pub struct Workflow {
    config: Config,
    collaborators: Collaborators,
}

impl Workflow {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        Self { config, collaborators }
    }

    /// Build the yt-dlp, ffmpeg, tesseract and chat API collaborators and
    /// check that every external binary can be run
    pub async fn from_config(config: Config) -> Result<Self> {
        let collaborators = Collaborators {
            source: VideoSourceFactory::create_source(config.fetch.clone()),
            media: MediaProcessorFactory::create_processor(config.media.clone()),
            recognizer: TextRecognizerFactory::create_recognizer(config.ocr.clone()),
            model: LanguageModelFactory::create_model(config.llm.clone())?,
        };

        // Check dependencies
        collaborators.source.check_availability().await?;
        collaborators.media.check_availability().await?;
        collaborators.recognizer.check_availability().await?;

        if config.llm.api_key.is_none() {
            warn!("No API key configured; model requests will likely be rejected");
        }

        Ok(Self::new(config, collaborators))
    }

    /// Run the whole pipeline for one video URL.
    ///
    /// Fatal errors abort the run before the output file is touched;
    /// per-frame OCR and per-unit model failures only shorten the output.
    pub async fn run(&self, url: &str) -> Result<RunSummary> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting run {} for {}", run_id, url);

        info!("Processing video...");
        let video_path = self.download_video(url).await?;
        let sampler = FrameSampler::new(&self.config.media, self.collaborators.media.clone());
        let frames = sampler.sample(&video_path).await?;

        info!("Processing transcript...");
        let parser = TranscriptParser::new(self.config.fetch.clone(), self.collaborators.source.clone());
        let captions = parser.fetch(url).await?;

        info!("Extracting text from frames...");
        let extractor = FrameTextExtractor::new(
            self.config.media.sample_rate,
            self.collaborators.recognizer.clone(),
        );
        let texts = extractor.extract(sampler.frames_dir()).await?;

        info!("Consolidating code...");
        let consolidator = Consolidator::new(&self.config.llm, self.collaborators.model.clone());
        let report = consolidator.consolidate(&captions, &texts).await;

        let output_path = self.config.output.path.clone();
        write_output(&output_path, &report).await?;

        if let Some(analysis_path) = &self.config.output.analysis_path {
            info!("Analyzing video content...");
            let analyzer = ContentAnalyzer::new(
                self.collaborators.model.clone(),
                self.config.llm.analysis_sampling(),
            );
            let analysis = analyzer.analyze(url, &captions, &texts).await;
            if let Err(e) = analysis.save(analysis_path).await {
                warn!("Failed to write analysis report: {}", e);
            }
        }

        let summary = RunSummary {
            run_id,
            started_at,
            frames_sampled: frames.len(),
            captions: captions.len(),
            frames_with_text: texts.len(),
            contributed: report.contributed(),
            skipped: report.skipped(),
            output_path,
        };

        info!(
            "Run {} finished in {}s: {} frames, {} with text, {} consolidated, {} skipped",
            summary.run_id,
            (Utc::now() - summary.started_at).num_seconds(),
            summary.frames_sampled,
            summary.frames_with_text,
            summary.contributed,
            summary.skipped
        );

        Ok(summary)
    }

    async fn download_video(&self, url: &str) -> Result<PathBuf> {
        let video_path = self.config.fetch.video_path.clone();

        if fs::metadata(&video_path).await.is_ok() {
            fs::remove_file(&video_path).await?;
        }

        self.collaborators.source.download_video(url, &video_path).await?;

        if !video_path.exists() {
            return Err(ReelError::FileNotFound(format!(
                "Video was not downloaded to {}",
                video_path.display()
            )));
        }

        Ok(video_path)
    }
}

async fn write_output(path: &Path, report: &ConsolidationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    fs::write(path, report.output()).await?;
    info!("Consolidated code written to {}", path.display());
    Ok(())
}

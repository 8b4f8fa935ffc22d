use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::error::Result;
use crate::ocr::ExtractedFrameText;
use crate::transcript::Caption;
use super::prompt::{frame_text_analysis_prompt, transcript_analysis_prompt, ANALYST_SYSTEM_PROMPT};
use super::{ChatMessage, LanguageModel, Sampling};

/// Free-form summaries of what a video talks about and what it shows
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub source_url: String,
    pub transcript: Option<String>,
    pub frame_text: Option<String>,
}

impl AnalysisReport {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Video analysis\n");
        let _ = writeln!(out, "- Source: {}", self.source_url);
        let _ = writeln!(out, "- Generated: {}\n", self.generated_at.to_rfc3339());

        let _ = writeln!(out, "## Transcript\n");
        let _ = writeln!(out, "{}\n", self.transcript.as_deref().unwrap_or("_No analysis available._"));

        let _ = writeln!(out, "## Frame text\n");
        let _ = writeln!(out, "{}", self.frame_text.as_deref().unwrap_or("_No analysis available._"));
        out
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.to_markdown()).await?;
        info!("Analysis report written to {}", path.display());
        Ok(())
    }
}

/// Asks the model for topic and content summaries
pub struct ContentAnalyzer {
    model: Arc<dyn LanguageModel>,
    sampling: Sampling,
}

impl ContentAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>, sampling: Sampling) -> Self {
        Self { model, sampling }
    }

    /// Topics, key points and a summary of the spoken content
    pub async fn analyze_transcript(&self, captions: &[Caption]) -> Option<String> {
        if captions.iter().all(|c| c.text.trim().is_empty()) {
            return None;
        }
        self.ask("transcript", transcript_analysis_prompt(captions)).await
    }

    /// Code, tools and commands visible on screen
    pub async fn analyze_frame_texts(&self, texts: &[ExtractedFrameText]) -> Option<String> {
        if texts.is_empty() {
            return None;
        }
        self.ask("frame text", frame_text_analysis_prompt(texts)).await
    }

    pub async fn analyze(
        &self,
        source_url: &str,
        captions: &[Caption],
        texts: &[ExtractedFrameText],
    ) -> AnalysisReport {
        AnalysisReport {
            generated_at: Utc::now(),
            source_url: source_url.to_string(),
            transcript: self.analyze_transcript(captions).await,
            frame_text: self.analyze_frame_texts(texts).await,
        }
    }

    async fn ask(&self, subject: &str, prompt: String) -> Option<String> {
        let messages = [ChatMessage::system(ANALYST_SYSTEM_PROMPT), ChatMessage::user(prompt)];
        match self.model.complete(&messages, self.sampling).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!("Failed to analyze {}: {}", subject, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::consolidate::{MockLanguageModel, ModelError};
    use crate::ocr::FrameRef;
    use crate::transcript::Timecode;
    use std::time::Duration;

    fn caption(text: &str) -> Caption {
        Caption {
            start: Timecode::from_millis(0),
            end: Timecode::from_millis(1_000),
            text: text.to_string(),
        }
    }

    fn frame_text(text: &str) -> ExtractedFrameText {
        ExtractedFrameText {
            frame: FrameRef {
                index: 0,
                file_name: "frame_0001.png".to_string(),
                timestamp: Duration::ZERO,
            },
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_analysis_uses_system_prompt() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(2)
            .withf(|messages, sampling| {
                messages.len() == 2
                    && messages[0].content == ANALYST_SYSTEM_PROMPT
                    && *sampling == Sampling { temperature: 0.7, max_tokens: 1024 }
            })
            .returning(|messages, _| {
                if messages[1].content.contains("Transcript:") {
                    Ok("Python functions".to_string())
                } else {
                    Ok("def keyword".to_string())
                }
            });

        let analyzer = ContentAnalyzer::new(Arc::new(model), LlmConfig::default().analysis_sampling());
        let report = analyzer
            .analyze("https://youtu.be/abc", &[caption("we define f")], &[frame_text("def f():")])
            .await;

        assert_eq!(report.transcript.as_deref(), Some("Python functions"));
        assert_eq!(report.frame_text.as_deref(), Some("def keyword"));
        let markdown = report.to_markdown();
        assert!(markdown.contains("## Transcript\n\nPython functions"));
        assert!(markdown.contains("- Source: https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn test_empty_inputs_and_failures_leave_sections_empty() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(ModelError::Status { code: 401, body: "bad key".to_string() }));

        let analyzer = ContentAnalyzer::new(Arc::new(model), LlmConfig::default().analysis_sampling());
        let report = analyzer.analyze("u", &[caption("hello")], &[]).await;

        assert!(report.transcript.is_none());
        assert!(report.frame_text.is_none());
        assert!(report.to_markdown().contains("_No analysis available._"));
    }
}

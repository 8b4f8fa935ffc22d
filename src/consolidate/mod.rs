// Reconciliation of transcript context with per-frame OCR text
//
// - Client: OpenAI-compatible chat completions over HTTP
// - Prompt: context selection and prompt wording
// - Analysis: optional transcript / frame text summaries
// - Consolidator: one model call per extracted frame text, in input order

pub mod analysis;
pub mod client;
pub mod prompt;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use analysis::{AnalysisReport, ContentAnalyzer};
pub use client::ChatCompletionClient;
pub use prompt::{build_prompt, context_for, transcript_context};

pub use crate::config::Sampling;

use crate::config::{ContextWindow, LlmConfig};
use crate::error::Result;
use crate::ocr::{ExtractedFrameText, FrameRef};
use crate::progress::stage_bar;
use crate::transcript::Caption;

/// Chat message for LLM communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Why a model call produced no contribution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model API returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl ModelError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Malformed(_) => false,
        }
    }
}

/// Maps a chat conversation to completion text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: Sampling,
    ) -> std::result::Result<String, ModelError>;
}

/// Factory for the default language model collaborator
pub struct LanguageModelFactory;

impl LanguageModelFactory {
    pub fn create_model(config: LlmConfig) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::new(ChatCompletionClient::new(config)?))
    }
}

/// Result of consolidating one extracted frame text
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Contributed { frame: FrameRef, text: String },
    Skipped { frame: FrameRef, reason: ModelError },
}

impl UnitOutcome {
    pub fn frame(&self) -> &FrameRef {
        match self {
            Self::Contributed { frame, .. } | Self::Skipped { frame, .. } => frame,
        }
    }
}

/// Outcomes in the same order as the consolidated input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl ConsolidationReport {
    /// Every contribution followed by a blank-line separator; skipped units leave no trace
    pub fn output(&self) -> String {
        let mut buffer = String::new();
        for outcome in &self.outcomes {
            if let UnitOutcome::Contributed { text, .. } = outcome {
                buffer.push_str(text);
                buffer.push_str("\n\n");
            }
        }
        buffer
    }

    pub fn contributed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, UnitOutcome::Contributed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.contributed()
    }

    pub fn skip_reasons(&self) -> Vec<(&FrameRef, &ModelError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                UnitOutcome::Skipped { frame, reason } => Some((frame, reason)),
                UnitOutcome::Contributed { .. } => None,
            })
            .collect()
    }
}

/// Builds one prompt per extracted frame text and collects the model's answers
pub struct Consolidator {
    model: Arc<dyn LanguageModel>,
    window: ContextWindow,
    sampling: Sampling,
    concurrency: usize,
}

impl Consolidator {
    pub fn new(config: &LlmConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            window: config.context_window,
            sampling: config.consolidation_sampling(),
            concurrency: config.concurrency.max(1),
        }
    }

    pub async fn consolidate(
        &self,
        captions: &[Caption],
        texts: &[ExtractedFrameText],
    ) -> ConsolidationReport {
        info!(
            "Consolidating {} snippets against {} captions ({} in flight)",
            texts.len(),
            captions.len(),
            self.concurrency
        );

        let pb = stage_bar(texts.len(), "Consolidating");

        // buffered() yields in input order regardless of completion order
        let outcomes: Vec<UnitOutcome> = stream::iter(texts)
            .map(|item| self.consolidate_unit(captions, item, &pb))
            .buffered(self.concurrency)
            .collect()
            .await;

        pb.finish_and_clear();

        let report = ConsolidationReport { outcomes };
        info!(
            "Consolidation complete: {} contributed, {} skipped",
            report.contributed(),
            report.skipped()
        );
        report
    }

    async fn consolidate_unit(
        &self,
        captions: &[Caption],
        item: &ExtractedFrameText,
        pb: &ProgressBar,
    ) -> UnitOutcome {
        let context = context_for(self.window, captions, item);
        let prompt = build_prompt(&context, &item.text);
        debug!("Prompt for {} is {} bytes", item.frame.file_name, prompt.len());

        let outcome = match self.model.complete(&[ChatMessage::user(prompt)], self.sampling).await {
            Ok(text) => UnitOutcome::Contributed { frame: item.frame.clone(), text },
            Err(reason) => {
                warn!("Skipping {}: {}", item.frame.file_name, reason);
                UnitOutcome::Skipped { frame: item.frame.clone(), reason }
            }
        };

        pb.inc(1);
        outcome
    }
}

use crate::config::ContextWindow;
use crate::ocr::ExtractedFrameText;
use crate::transcript::Caption;

/// Caption texts in track order joined by single spaces
pub fn transcript_context(captions: &[Caption]) -> String {
    captions
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Context for one frame under the configured window
pub fn context_for(window: ContextWindow, captions: &[Caption], item: &ExtractedFrameText) -> String {
    match window {
        ContextWindow::Full => transcript_context(captions),
        ContextWindow::Around { seconds } => {
            let at = item.frame.timestamp.as_secs_f64();
            let nearby: Vec<Caption> = captions
                .iter()
                .filter(|c| c.overlaps(at - seconds, at + seconds))
                .cloned()
                .collect();
            transcript_context(&nearby)
        }
    }
}

/// Consolidation request for one snippet
pub fn build_prompt(context: &str, snippet: &str) -> String {
    format!(
        "Context:\n{}\n\nCode Snippet:\n{}\n\nConsolidate and improve the code based on the context.",
        context, snippet
    )
}

pub const ANALYST_SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes video content.";

pub fn transcript_analysis_prompt(captions: &[Caption]) -> String {
    let full_text = captions
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following video transcript and provide:\n\
         1. Main topics discussed\n\
         2. Key points or insights\n\
         3. Summary of content\n\
         \n\
         Transcript:\n\
         {}",
        full_text
    )
}

pub fn frame_text_analysis_prompt(texts: &[ExtractedFrameText]) -> String {
    let content = texts
        .iter()
        .map(|t| format!("Frame {}: {}", t.frame.file_name, t.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following text extracted from video frames and provide:\n\
         1. Identify any code snippets or technical content\n\
         2. List tools, technologies, or concepts mentioned\n\
         3. Extract any important commands or syntax\n\
         \n\
         Extracted Text:\n\
         {}",
        content
    )
}

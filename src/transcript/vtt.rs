use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, ReelError};
use super::{Caption, Timecode};

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+-->\s+(\S+)(?:\s+.*)?$").expect("valid timing regex")
});

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+):)?([0-5]\d):([0-5]\d)\.(\d{3})$").expect("valid timestamp regex")
});

// Voice spans, class spans and karaoke timestamps in auto-generated tracks
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Parse a WebVTT document into captions, keeping cue order and empty cues
pub fn parse_vtt(content: &str) -> Result<Vec<Caption>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let blocks = split_blocks(&content);

    let header = blocks.first().ok_or_else(|| error(1, "empty subtitle file"))?;
    if !header.lines[0].starts_with("WEBVTT") {
        return Err(error(header.first_line, "missing WEBVTT header"));
    }

    let mut captions = Vec::new();
    for block in blocks.iter().skip(1) {
        if is_metadata_block(block) {
            continue;
        }
        captions.push(parse_cue(block)?);
    }

    Ok(captions)
}

struct Block<'a> {
    /// 1-based line number of the block's first line
    first_line: usize,
    lines: Vec<&'a str>,
}

fn split_blocks(content: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        current
            .get_or_insert_with(|| Block { first_line: idx + 1, lines: Vec::new() })
            .lines
            .push(line);
    }

    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

fn is_metadata_block(block: &Block) -> bool {
    let first = block.lines[0];
    !first.contains("-->")
        && (first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION"))
}

fn parse_cue(block: &Block) -> Result<Caption> {
    // An optional identifier line may precede the timing line
    let timing_idx = block
        .lines
        .iter()
        .take(2)
        .position(|l| l.contains("-->"))
        .ok_or_else(|| error(block.first_line, "expected cue timing line"))?;
    let line_no = block.first_line + timing_idx;

    let captures = TIMING
        .captures(block.lines[timing_idx].trim())
        .ok_or_else(|| error(line_no, "malformed cue timing line"))?;
    let start = parse_timestamp(&captures[1]).ok_or_else(|| error(line_no, "malformed start time"))?;
    let end = parse_timestamp(&captures[2]).ok_or_else(|| error(line_no, "malformed end time"))?;

    if end < start {
        return Err(error(line_no, &format!("cue ends ({}) before it starts ({})", end, start)));
    }

    let raw = block.lines[timing_idx + 1..].join("\n");
    Ok(Caption { start, end, text: clean_text(&raw) })
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm`
fn parse_timestamp(value: &str) -> Option<Timecode> {
    let caps = TIMESTAMP.captures(value)?;
    let hours: u64 = caps.get(1).map_or(Some(0), |h| h.as_str().parse().ok())?;
    let minutes: u64 = caps[2].parse().ok()?;
    let secs: u64 = caps[3].parse().ok()?;
    let millis: u64 = caps[4].parse().ok()?;

    // Hours are unbounded in the grammar; reject values past the u64 range
    let total = hours
        .checked_mul(3_600_000)?
        .checked_add(minutes * 60_000 + secs * 1_000 + millis)?;

    Some(Timecode::from_millis(total))
}

fn clean_text(raw: &str) -> String {
    let stripped = TAG.replace_all(raw, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

fn error(line: usize, message: &str) -> ReelError {
    ReelError::Subtitle { line, message: message.to_string() }
}
